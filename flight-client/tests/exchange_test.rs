//! Integration tests against an in-process fake server on loopback.
//!
//! The fake server runs on its own thread, decodes each request with the
//! library codec and answers according to a per-test handler.  It stops
//! after a fixed number of requests or after an idle period.

use std::net::{SocketAddr, UdpSocket};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use flight_client::codec::decode_request;
use flight_client::{
    ClientConfig, ClientError, FlightClient, Opcode, RequestPayload, ResponseMessage,
};

/// What the fake server does with one request.
enum Action {
    Reply(Vec<String>),
    /// Pretend the request was lost.
    Ignore,
    /// Send each update after its delay from the request's arrival.
    Stream(Vec<(Duration, String)>),
}

type Seen = Vec<(Opcode, RequestPayload)>;

fn spawn_server<F>(max_requests: usize, mut handler: F) -> (SocketAddr, JoinHandle<Seen>)
where
    F: FnMut(usize, Opcode, &RequestPayload) -> Action + Send + 'static,
{
    let socket = UdpSocket::bind("127.0.0.1:0").expect("bind fake server");
    let addr = socket.local_addr().unwrap();
    socket
        .set_read_timeout(Some(Duration::from_secs(3)))
        .unwrap();

    let handle = thread::spawn(move || {
        let mut seen = Vec::new();
        let mut buf = [0u8; 2048];
        while seen.len() < max_requests {
            let Ok((n, client)) = socket.recv_from(&mut buf) else {
                break;
            };
            let (opcode, payload) = decode_request(&buf[..n]).expect("client sent valid request");
            let action = handler(seen.len(), opcode, &payload);
            seen.push((opcode, payload));

            match action {
                Action::Reply(messages) => send(&socket, client, opcode, messages),
                Action::Ignore => {}
                Action::Stream(updates) => {
                    let start = Instant::now();
                    for (at, text) in updates {
                        if let Some(wait) = at.checked_sub(start.elapsed()) {
                            thread::sleep(wait);
                        }
                        send(&socket, client, opcode, vec![text]);
                    }
                }
            }
        }
        seen
    });
    (addr, handle)
}

fn send(socket: &UdpSocket, client: SocketAddr, opcode: Opcode, messages: Vec<String>) {
    let bytes = ResponseMessage {
        status_code: 0,
        opcode: opcode.to_u8(),
        messages,
    }
    .encode()
    .unwrap();
    socket.send_to(&bytes, client).unwrap();
}

fn config(server: SocketAddr) -> ClientConfig {
    ClientConfig {
        server: server.to_string(),
        exchange_timeout: Duration::from_millis(300),
        poll_interval: Duration::from_millis(100),
        loss_rate: 0.0,
        ..Default::default()
    }
}

#[test]
fn every_operation_round_trips_through_a_server() {
    let (addr, server) = spawn_server(5, |_, opcode, payload| {
        Action::Reply(vec![match opcode {
            Opcode::QueryFlights => format!("{} -> {}: flight 12", payload.source, payload.destination),
            Opcode::FlightDetails => format!("Flight {} departs 09:30", payload.id),
            Opcode::Reserve => format!("Reserved {} seat(s)", payload.seats_to_book),
            Opcode::QueryPoints => "Points: 250".to_string(),
            Opcode::ReserveWithPoints => "Reservation successful".to_string(),
            Opcode::Monitor => unreachable!(),
        }])
    });

    let mut client = FlightClient::connect(&config(addr)).expect("connect");
    assert_eq!(
        client.query_flights("Singapore", "Tokyo").unwrap().messages,
        vec!["Singapore -> Tokyo: flight 12"]
    );
    assert_eq!(
        client.flight_details(12).unwrap().messages,
        vec!["Flight 12 departs 09:30"]
    );
    assert_eq!(
        client.reserve_seats(12, 2).unwrap().messages,
        vec!["Reserved 2 seat(s)"]
    );
    assert_eq!(client.query_points().unwrap().messages, vec!["Points: 250"]);
    let last = client.reserve_seats_with_points(12, 1).unwrap();
    assert_eq!(last.status_code, 0);
    assert_eq!(last.opcode, 6);

    let seen = server.join().unwrap();
    assert_eq!(seen.len(), 5);
    assert_eq!(client.transport().stats().datagrams_sent, 5);
}

#[test]
fn lost_request_is_resent_until_answered() {
    let (addr, server) = spawn_server(3, |i, _, _| {
        if i < 2 {
            Action::Ignore
        } else {
            Action::Reply(vec!["Reservation successful".into()])
        }
    });

    let mut client = FlightClient::connect(&config(addr)).unwrap();
    let response = client.reserve_seats(7, 3).unwrap();
    assert_eq!(response.messages, vec!["Reservation successful"]);

    let seen = server.join().unwrap();
    assert_eq!(seen.len(), 3);
    assert!(seen.iter().all(|(op, p)| *op == Opcode::Reserve && p.id == 7 && p.seats_to_book == 3));
}

#[test]
fn silent_server_exhausts_retries() {
    let (addr, server) = spawn_server(3, |_, _, _| Action::Ignore);

    let mut client = FlightClient::connect(&config(addr)).unwrap();
    let start = Instant::now();
    let err = client.query_points().unwrap_err();
    assert!(matches!(err, ClientError::ExchangeFailed { attempts: 3 }));
    assert!(start.elapsed() >= Duration::from_millis(900));
    assert_eq!(server.join().unwrap().len(), 3);
}

#[cfg(feature = "simulate-loss")]
#[test]
fn total_simulated_loss_never_reaches_server() {
    let (addr, server) = spawn_server(1, |_, _, _| Action::Reply(vec!["unexpected".into()]));

    let mut client = FlightClient::connect(&ClientConfig {
        loss_rate: 1.0,
        loss_seed: Some(3),
        exchange_timeout: Duration::from_millis(100),
        ..config(addr)
    })
    .unwrap();
    let err = client.flight_details(1).unwrap_err();
    assert!(matches!(err, ClientError::ExchangeFailed { attempts: 3 }));
    assert_eq!(client.transport().stats().datagrams_dropped, 3);
    assert_eq!(client.transport().stats().datagrams_sent, 0);

    assert!(server.join().unwrap().is_empty());
}

#[test]
fn monitor_collects_updates_for_the_window() {
    let (addr, server) = spawn_server(1, |_, _, payload| {
        assert_eq!(payload.duration_secs, 2);
        Action::Stream(vec![
            (Duration::from_millis(200), "Flight 5 seat update: 9".into()),
            (Duration::from_millis(700), "Flight 5 seat update: 8".into()),
            (Duration::from_millis(1500), "Flight 5 seat update: 7".into()),
            // After the window closes; never observed.
            (Duration::from_millis(2600), "Flight 5 seat update: 6".into()),
        ])
    });

    let mut client = FlightClient::connect(&config(addr)).unwrap();
    let start = Instant::now();
    let updates: Vec<ResponseMessage> = client
        .monitor_seats(5, 2)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    let elapsed = start.elapsed();

    let texts: Vec<&str> = updates.iter().map(|u| u.messages[0].as_str()).collect();
    assert_eq!(
        texts,
        vec![
            "Flight 5 seat update: 9",
            "Flight 5 seat update: 8",
            "Flight 5 seat update: 7"
        ]
    );
    assert!(elapsed >= Duration::from_secs(2), "took {elapsed:?}");
    assert!(elapsed < Duration::from_secs(3), "took {elapsed:?}");

    let seen = server.join().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, Opcode::Monitor);
}

#[test]
fn monitor_window_with_no_updates_is_empty() {
    let (addr, server) = spawn_server(1, |_, _, _| Action::Ignore);

    let mut client = FlightClient::connect(&config(addr)).unwrap();
    let mut window = client.monitor_seats(1, 1).unwrap();
    assert!(window.next().is_none());
    assert_eq!(window.updates_received(), 0);
    drop(window);

    assert_eq!(server.join().unwrap().len(), 1);
}

#[test]
fn invalid_config_is_rejected_before_binding() {
    let err = FlightClient::connect(&ClientConfig {
        max_attempts: 0,
        ..Default::default()
    })
    .err()
    .expect("zero attempts must be rejected");
    assert!(err.is_input_error());
}
