use std::io::ErrorKind;
use std::sync::Arc;
use feedlane::socket::mock::{ConnectPlan, MockNet};
use feedlane::{DatagramClient, LinkConfig, LinkError, LinkState, ManualClock, StreamClient};

type Client = StreamClient<MockNet, Arc<ManualClock>>;

fn client(config: LinkConfig) -> (Client, MockNet, Arc<ManualClock>) {
	let net = MockNet::new();
	let clock = Arc::new(ManualClock::new());
	(StreamClient::with_net(net.clone(), clock.clone(), config), net, clock)
}

#[test]
fn lost_link_comes_back_under_every_retrying_config() {
	let configs = [
		(0.0, 0.0, 0.0),
		(5.0, 0.0, 1.0),
		(0.0, 3.0, 2.5),
		(10.0, 30.0, 0.0),
	];
	for (connect, inactive, wait) in configs {
		let (mut client, net, clock) = client(LinkConfig::from_secs(connect, inactive, wait));
		client.open("10.2.0.1", 2101).unwrap();
		let mut buf = [0u8; 32];
		client.read(&mut buf).unwrap();
		assert!(client.is_connected());

		net.last_peer().unwrap().break_reads(ErrorKind::ConnectionReset);
		net.script_connect(ConnectPlan::Refuse(ErrorKind::ConnectionRefused));
		net.script_connect(ConnectPlan::FailLater(ErrorKind::ConnectionRefused));

		let mut recovered = false;
		for _ in 0..50 {
			clock.advance_secs(0.5);
			if let Err(err) = client.read(&mut buf) {
				assert!(!err.is_terminal(), "{:?} went terminal: {}", (connect, inactive, wait), err);
			}
			if client.is_connected() {
				recovered = true;
				break;
			}
		}
		assert!(recovered, "{:?} never reconnected", (connect, inactive, wait));
		assert_eq!(net.connect_attempts(), 4);
	}
}

#[test]
fn one_shot_makes_exactly_one_attempt_per_open() {
	let (mut client, net, clock) = client(LinkConfig::from_secs(5.0, 0.0, -1.0));
	client.open("10.2.0.1", 2101).unwrap();
	let mut buf = [0u8; 32];
	client.read(&mut buf).unwrap();
	net.last_peer().unwrap().close();
	assert_eq!(client.read(&mut buf).unwrap(), 0);

	for _ in 0..5 {
		clock.advance_secs(10.0);
		assert!(matches!(client.read(&mut buf), Err(LinkError::Terminal { .. })));
		assert!(matches!(client.write(b"x"), Err(LinkError::Terminal { .. })));
	}
	assert_eq!(net.connect_attempts(), 1);

	client.close();
	client.open("10.2.0.1", 2101).unwrap();
	client.read(&mut buf).unwrap();
	assert!(client.is_connected());
	assert_eq!(net.connect_attempts(), 2);
}

#[test]
fn close_on_fresh_and_closed_clients_is_harmless() {
	let (mut client, _net, _clock) = client(LinkConfig::new());
	client.close();
	client.close();
	assert_eq!(client.state(), LinkState::Error);
	assert!(!client.is_open());

	let mut udp = DatagramClient::with_net(MockNet::new(), Arc::new(ManualClock::new()), LinkConfig::new());
	udp.close();
	udp.close();
	assert!(!udp.is_open());
}

#[test]
fn quiet_link_goes_through_error_to_waiting() {
	let (mut client, net, clock) = client(LinkConfig::from_secs(0.0, 2.0, 0.0));
	client.open("10.2.0.1", 2101).unwrap();
	let mut buf = [0u8; 32];
	client.read(&mut buf).unwrap();
	assert!(client.is_connected());

	clock.advance_secs(2.0);
	assert_eq!(client.read(&mut buf).unwrap(), 0);
	assert_eq!(client.state(), LinkState::Waiting);
	assert!(net.peers()[0].is_dropped());

	client.read(&mut buf).unwrap();
	client.read(&mut buf).unwrap();
	assert!(client.is_connected());
}

#[test]
fn quiet_datagram_link_is_reopened() {
	let net = MockNet::new();
	let clock = Arc::new(ManualClock::new());
	let mut client = DatagramClient::with_net(net.clone(), clock.clone(), LinkConfig::from_secs(0.0, 5.0, 1.0));
	client.open("10.2.0.9", 9000).unwrap();

	clock.advance_secs(5.0);
	let mut buf = [0u8; 32];
	client.read(&mut buf).unwrap();
	assert_eq!(client.state(), LinkState::Waiting);

	clock.advance_secs(1.0);
	net.peers()[0].push(b"stale");
	client.read(&mut buf).unwrap();
	assert!(client.is_connected());
	assert_eq!(net.connect_attempts(), 2);
}
