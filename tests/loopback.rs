//! End-to-end checks on real sockets bound to 127.0.0.1.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream, UdpSocket};
use std::thread;
use std::time::{Duration, Instant};
use feedlane::{
	DatagramClient, LinkConfig, LinkError, NtripClient, NtripConfig, ReadPolicy, ServerConfig,
	StreamClient, StreamServer,
};

const DEADLINE: Duration = Duration::from_secs(5);

/// Polls `step` until it returns true, sleeping a little between calls.
fn until(what: &str, mut step: impl FnMut() -> bool) {
	let start = Instant::now();
	while !step() {
		assert!(start.elapsed() < DEADLINE, "timed out waiting for {}", what);
		thread::sleep(Duration::from_millis(2));
	}
}

fn with_timeout(stream: TcpStream) -> TcpStream {
	stream.set_read_timeout(Some(DEADLINE)).unwrap();
	stream
}

#[test]
fn stream_client_talks_to_a_tcp_peer() {
	let listener = TcpListener::bind("127.0.0.1:0").unwrap();
	let port = listener.local_addr().unwrap().port();

	let mut client = StreamClient::new(LinkConfig::from_secs(5.0, 0.0, 1.0));
	client.open("127.0.0.1", port).unwrap();
	let (peer, _) = listener.accept().unwrap();
	let mut peer = with_timeout(peer);

	until("connect", || {
		client.read(&mut [0u8; 8]).unwrap();
		client.is_connected()
	});

	peer.write_all(b"hello").unwrap();
	let mut got = Vec::new();
	until("data", || {
		let mut buf = [0u8; 16];
		let n = client.read(&mut buf).unwrap();
		got.extend_from_slice(&buf[..n]);
		got.len() >= 5
	});
	assert_eq!(got, b"hello");

	assert_eq!(client.write(b"$GPGGA\r\n").unwrap(), 8);
	let mut line = [0u8; 8];
	peer.read_exact(&mut line).unwrap();
	assert_eq!(&line, b"$GPGGA\r\n");

	drop(peer);
	until("disconnect", || {
		client.read(&mut [0u8; 8]).unwrap();
		!client.is_connected()
	});
	client.close();
}

#[test]
fn stream_client_reconnects_to_a_restarted_peer() {
	let listener = TcpListener::bind("127.0.0.1:0").unwrap();
	let port = listener.local_addr().unwrap().port();

	let mut client = StreamClient::new(LinkConfig::from_secs(5.0, 0.0, 0.0));
	client.open("127.0.0.1", port).unwrap();
	let (first, _) = listener.accept().unwrap();
	until("connect", || {
		client.read(&mut [0u8; 8]).unwrap();
		client.is_connected()
	});
	drop(first);

	until("drop", || {
		client.read(&mut [0u8; 8]).unwrap();
		!client.is_connected()
	});

	listener.set_nonblocking(true).unwrap();
	let mut second = None;
	until("reconnect", || {
		let _ = client.read(&mut [0u8; 8]);
		if second.is_none() {
			second = listener.accept().ok().map(|(stream, _)| stream);
		}
		second.is_some() && client.is_connected()
	});
}

#[test]
fn one_shot_client_gives_up_on_a_dead_port() {
	let port = {
		let probe = TcpListener::bind("127.0.0.1:0").unwrap();
		probe.local_addr().unwrap().port()
	};

	let mut client = StreamClient::new(LinkConfig::from_secs(5.0, 0.0, -1.0));
	match client.open("127.0.0.1", port) {
		// Some kernels refuse loopback connects synchronously.
		Err(LinkError::Resolve { .. }) => return,
		Err(err) => panic!("unexpected open error: {}", err),
		Ok(()) => {}
	}

	let mut terminal = false;
	until("terminal failure", || {
		match client.read(&mut [0u8; 8]) {
			Err(err) => terminal = err.is_terminal(),
			Ok(_) => {}
		}
		terminal
	});
	assert!(client.read(&mut [0u8; 8]).unwrap_err().is_terminal());
}

#[test]
fn datagram_client_exchanges_packets() {
	let peer = UdpSocket::bind("127.0.0.1:0").unwrap();
	peer.set_read_timeout(Some(DEADLINE)).unwrap();
	let port = peer.local_addr().unwrap().port();

	let mut client = DatagramClient::new(LinkConfig::new());
	client.open("127.0.0.1", port).unwrap();
	assert!(client.is_connected());
	assert_eq!(client.write(b"ping").unwrap(), 4);

	let mut buf = [0u8; 16];
	let (n, from) = peer.recv_from(&mut buf).unwrap();
	assert_eq!(&buf[..n], b"ping");
	peer.send_to(b"pong", from).unwrap();

	let mut got = [0u8; 16];
	let mut len = 0;
	until("reply", || {
		len = client.read(&mut got).unwrap();
		len > 0
	});
	assert_eq!(&got[..len], b"pong");
}

#[test]
fn server_fans_out_and_reads_round_robin() {
	let mut server = StreamServer::new(ServerConfig::new().capacity(2).read_policy(ReadPolicy::RoundRobinAll));
	server.open("127.0.0.1", 0).unwrap();
	let port = server.local_addr().unwrap().port().unwrap();

	let mut a = with_timeout(TcpStream::connect(("127.0.0.1", port)).unwrap());
	let mut b = with_timeout(TcpStream::connect(("127.0.0.1", port)).unwrap());
	until("both peers", || {
		server.poll().unwrap();
		server.client_count() == 2
	});

	let mut c = TcpStream::connect(("127.0.0.1", port)).unwrap();
	c.set_read_timeout(Some(Duration::from_millis(5))).unwrap();
	until("overflow peer rejected", || {
		server.poll().unwrap();
		matches!(c.read(&mut [0u8; 1]), Ok(0))
	});
	assert_eq!(server.client_count(), 2);

	assert_eq!(server.write(b"rtcm").unwrap(), 4);
	for peer in [&mut a, &mut b] {
		let mut buf = [0u8; 4];
		peer.read_exact(&mut buf).unwrap();
		assert_eq!(&buf, b"rtcm");
	}

	a.write_all(b"A").unwrap();
	b.write_all(b"B").unwrap();
	let mut got = Vec::new();
	until("both uploads", || {
		let mut buf = [0u8; 4];
		let n = server.read(&mut buf).unwrap();
		got.extend_from_slice(&buf[..n]);
		got.len() >= 2
	});
	got.sort_unstable();
	assert_eq!(got, b"AB");

	drop(a);
	until("eviction", || {
		server.read(&mut [0u8; 4]).unwrap();
		server.client_count() == 1
	});
	server.close();
}

#[test]
fn ntrip_client_streams_from_a_caster() {
	let listener = TcpListener::bind("127.0.0.1:0").unwrap();
	let port = listener.local_addr().unwrap().port();

	let caster = thread::spawn(move || {
		let (stream, _) = listener.accept().unwrap();
		let mut stream = with_timeout(stream);
		let mut request = Vec::new();
		let mut byte = [0u8; 1];
		while !request.ends_with(b"\r\n\r\n") {
			stream.read_exact(&mut byte).unwrap();
			request.push(byte[0]);
		}
		stream.write_all(b"ICY 200 OK\r\n").unwrap();

		let mut gga = [0u8; 8];
		stream.read_exact(&mut gga).unwrap();
		assert_eq!(&gga, b"$GPGGA\r\n");
		stream.write_all(b"RTCMDATA").unwrap();
		String::from_utf8(request).unwrap()
	});

	let mut client = NtripClient::new(NtripConfig::new().user_agent("NTRIP loopback"));
	client.open("127.0.0.1", port, "alice", "secret", "MOUNT1").unwrap();

	let mut got = Vec::new();
	let mut sent_gga = false;
	until("corrections", || {
		let mut buf = [0u8; 64];
		let n = client.read(&mut buf).unwrap();
		got.extend_from_slice(&buf[..n]);
		if client.is_streaming() && !sent_gga {
			sent_gga = client.write(b"$GPGGA\r\n").unwrap() == 8;
		}
		got.len() >= 8
	});
	assert_eq!(got, b"RTCMDATA");

	let request = caster.join().unwrap();
	assert_eq!(
		request,
		"GET /MOUNT1 HTTP/1.0\r\nUser-Agent: NTRIP loopback\r\nAuthorization: Basic YWxpY2U6c2VjcmV0\r\n\r\n"
	);
	client.close();
}
