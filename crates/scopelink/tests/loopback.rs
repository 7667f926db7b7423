use std::io::Write;
use std::thread;
use std::time::Duration;

use scopelink::frame::{
    controller_entries, decode_controller, encode_controller, Command, Controller, Frame,
    FrameError, FrameReceiver, FrameWriter,
};
use scopelink::transport::TcpTransport;
use scopelink::{Link, LinkConfig, LinkError, PROTOCOL_VERSION};

fn test_config() -> LinkConfig {
    LinkConfig {
        poll_interval_ms: 20,
        ..LinkConfig::default()
    }
}

/// Minimal device: answers SERVER_VERSION and FPGA register reads, echoes SETs,
/// and hangs up on DISCONNECT.
fn spawn_device(transport: TcpTransport) -> thread::JoinHandle<Vec<Command>> {
    thread::spawn(move || {
        let stream = transport.accept().unwrap();
        let writer_stream = stream.try_clone().unwrap();
        let mut receiver = FrameReceiver::new(stream);
        let mut writer = FrameWriter::new(writer_stream);
        let mut seen = Vec::new();

        loop {
            let frames = match receiver.receive() {
                Ok(frames) => frames,
                Err(_) => return seen,
            };
            for frame in frames {
                seen.push(frame.command);
                match frame.command {
                    Command::ServerVersion => writer
                        .send(Command::ServerVersion, PROTOCOL_VERSION.as_bytes())
                        .unwrap(),
                    Command::Get => {
                        let request = decode_controller(&frame.payload).unwrap();
                        let data: Vec<u8> = (0..request.length).map(|i| i as u8).collect();
                        writer
                            .send_controller(
                                Command::Get,
                                request.controller,
                                request.address,
                                request.length,
                                Some(data.as_slice()),
                            )
                            .unwrap();
                    }
                    Command::Set => writer.write_frame(&frame).unwrap(),
                    Command::Disconnect => return seen,
                    _ => {}
                }
            }
        }
    })
}

#[test]
fn request_response_over_tcp() {
    let transport = TcpTransport::bind("127.0.0.1:0").unwrap();
    let addr = transport.local_addr();
    let device = spawn_device(transport);

    let mut link = Link::connect(addr, &test_config()).unwrap();
    assert_eq!(link.peer_addr(), Some(addr));

    link.send(Command::ServerVersion, &[]).unwrap();
    let version = link.read_frame().unwrap();
    assert_eq!(version.command, Command::ServerVersion);
    assert_eq!(version.payload.as_ref(), PROTOCOL_VERSION.as_bytes());

    link.send_controller(Command::Get, Controller::Fpga, 0x0020, 6, None)
        .unwrap();
    let reply = link.read_frame().unwrap();
    let access = decode_controller(&reply.payload).unwrap();
    assert_eq!(access.controller, Controller::Fpga);
    assert_eq!(access.address, 0x0020);
    assert_eq!(access.data.as_deref(), Some(&[0u8, 1, 2, 3, 4, 5][..]));

    link.send(Command::Disconnect, &[]).unwrap();
    let seen = device.join().unwrap();
    assert_eq!(
        seen,
        vec![Command::ServerVersion, Command::Get, Command::Disconnect]
    );

    let err = link.receive().unwrap_err();
    assert!(err.is_connection_lost());
}

#[test]
fn concurrent_senders_are_serialized() {
    let transport = TcpTransport::bind("127.0.0.1:0").unwrap();
    let addr = transport.local_addr();
    let device = spawn_device(transport);

    let mut link = Link::connect(addr, &test_config()).unwrap();

    let workers: Vec<_> = (0..4u8)
        .map(|worker| {
            let sender = link.sender();
            thread::spawn(move || {
                for i in 0..25u8 {
                    let mut payload = vec![0x03, i, 0x00, 0x02, 0x00];
                    payload.extend_from_slice(&[worker, i]);
                    sender.send(Command::Set, &payload).unwrap();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    let mut echoed = Vec::new();
    while echoed.len() < 100 {
        echoed.extend(link.receive().unwrap());
    }

    for frame in &echoed {
        assert_eq!(frame.command, Command::Set);
        let access = decode_controller(&frame.payload).unwrap();
        let data = access.data.unwrap();
        assert_eq!(data[1] as u16, access.address);
    }

    link.send(Command::Disconnect, &[]).unwrap();
    device.join().unwrap();
}

#[test]
fn dribbled_bytes_reassemble() {
    let transport = TcpTransport::bind("127.0.0.1:0").unwrap();
    let addr = transport.local_addr();

    let device = thread::spawn(move || {
        let mut stream = transport.accept().unwrap();
        let mut wire = Vec::new();
        wire.extend(
            Frame::new(Command::Data, vec![0xabu8; 300])
                .to_bytes()
                .unwrap(),
        );
        wire.extend(Frame::header_only(Command::Flush).to_bytes().unwrap());

        for chunk in wire.chunks(7) {
            stream.write_all(chunk).unwrap();
            stream.flush().unwrap();
            thread::sleep(Duration::from_millis(1));
        }
    });

    let mut link = Link::connect(addr, &test_config()).unwrap();
    let mut frames = Vec::new();
    while frames.len() < 2 {
        frames.extend(link.receive().unwrap());
    }
    device.join().unwrap();

    assert_eq!(frames[0].command, Command::Data);
    assert_eq!(frames[0].payload.len(), 300);
    assert!(frames[0].payload.iter().all(|b| *b == 0xab));
    assert_eq!(frames[1].command, Command::Flush);
    assert!(frames[1].payload().is_none());
    assert_eq!(link.buffered(), 0);
}

#[test]
fn oversized_frame_drops_link() {
    let transport = TcpTransport::bind("127.0.0.1:0").unwrap();
    let addr = transport.local_addr();

    let device = thread::spawn(move || {
        let mut stream = transport.accept().unwrap();
        let frame = Frame::new(Command::Acquisition, vec![0u8; 256]);
        stream.write_all(&frame.to_bytes().unwrap()).unwrap();
        stream
    });

    let config = LinkConfig {
        buffer_capacity: 64,
        ..test_config()
    };
    let mut link = Link::connect(addr, &config).unwrap();

    let err = link.receive().unwrap_err();
    assert!(matches!(
        err,
        LinkError::Frame(FrameError::BufferOverflow {
            needed: 261,
            capacity: 64
        })
    ));
    assert!(err.is_connection_lost());
    drop(device.join().unwrap());
}

#[test]
fn close_from_another_thread() {
    let transport = TcpTransport::bind("127.0.0.1:0").unwrap();
    let addr = transport.local_addr();
    let device = thread::spawn(move || transport.accept().unwrap());

    let mut link = Link::connect(addr, &test_config()).unwrap();
    let _device_stream = device.join().unwrap();
    let closer = link.closer();

    let waiter = thread::spawn(move || link.receive());
    thread::sleep(Duration::from_millis(60));
    closer.close().unwrap();

    let err = waiter.join().unwrap().unwrap_err();
    assert!(err.is_connection_lost());
}

#[test]
fn multi_entry_set_payload() {
    let mut first = bytes::BytesMut::new();
    encode_controller(
        Command::Set,
        Controller::Fpga,
        0x01,
        1,
        Some(&[0x7f][..]),
        &mut first,
    )
    .unwrap();
    let mut second = bytes::BytesMut::new();
    encode_controller(
        Command::Set,
        Controller::Awg,
        0x40,
        2,
        Some(&[0x01, 0x02][..]),
        &mut second,
    )
    .unwrap();

    let mut payload = first[5..].to_vec();
    payload.extend_from_slice(&second[5..]);

    let entries = controller_entries(&payload)
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].controller, Controller::Fpga);
    assert_eq!(entries[1].controller, Controller::Awg);
    assert_eq!(entries[1].address, 0x40);
}
