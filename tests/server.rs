use std::io::ErrorKind;
use feedlane::socket::mock::{MockNet, MockPeer};
use feedlane::{ReadPolicy, ServerConfig, StreamServer};

fn server_with(net: &MockNet, config: ServerConfig) -> StreamServer<MockNet> {
	let mut server = StreamServer::with_net(net.clone(), config);
	server.open("", 2102).unwrap();
	server
}

fn connect(server: &mut StreamServer<MockNet>, net: &MockNet) -> MockPeer {
	let peer = net.incoming();
	assert!(server.poll().unwrap());
	peer
}

#[test]
fn round_robin_is_fair_across_a_lap() {
	let net = MockNet::new();
	let mut server = server_with(&net, ServerConfig::new().capacity(4).read_policy(ReadPolicy::RoundRobinAll));
	let peers: Vec<_> = (0..3).map(|_| connect(&mut server, &net)).collect();
	for (peer, data) in peers.iter().zip([b"aaaaa", b"bbbbb", b"ccccc"]) {
		peer.push(data);
	}

	for _ in 0..5 {
		let mut seen = Vec::new();
		for _ in 0..3 {
			let mut buf = [0u8; 1];
			if server.read(&mut buf).unwrap() == 1 {
				seen.push(buf[0]);
			}
		}
		seen.sort_unstable();
		assert_eq!(seen, b"abc", "one lap must reach every peer once");
	}
}

#[test]
fn broken_peer_is_evicted_without_hurting_the_broadcast() {
	let net = MockNet::new();
	let mut server = server_with(&net, ServerConfig::new());
	let healthy = connect(&mut server, &net);
	let broken = connect(&mut server, &net);
	broken.break_writes(ErrorKind::ConnectionReset);

	assert_eq!(server.write(b"correction").unwrap(), 10);
	assert_eq!(server.client_count(), 1);
	assert!(broken.is_dropped());
	assert_eq!(healthy.take_written(), b"correction");

	let late = net.incoming();
	assert_eq!(server.write(b"next").unwrap(), 4);
	assert_eq!(server.client_count(), 2);
	assert_eq!(late.take_written(), b"next");
	assert_eq!(healthy.take_written(), b"next");
}

#[test]
fn accept_sweep_takes_one_peer_per_call() {
	let net = MockNet::new();
	let mut server = server_with(&net, ServerConfig::new().read_policy(ReadPolicy::None));
	for _ in 0..3 {
		net.incoming();
	}
	let mut buf = [0u8; 8];
	server.read(&mut buf).unwrap();
	assert_eq!(server.client_count(), 1);
	server.read(&mut buf).unwrap();
	server.read(&mut buf).unwrap();
	assert_eq!(server.client_count(), 3);
}

#[test]
fn closed_server_can_be_reopened() {
	let net = MockNet::new();
	let mut server = server_with(&net, ServerConfig::new());
	let peer = connect(&mut server, &net);
	server.close();
	assert!(peer.is_dropped());
	assert_eq!(server.client_count(), 0);

	server.open("", 2102).unwrap();
	connect(&mut server, &net);
	assert_eq!(server.client_count(), 1);
}
