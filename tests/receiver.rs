use aton_receiver::core::aton::*;
use aton_receiver::displays::{DisplayEvent, RecordingDisplay};

use std::io::Write;
use std::net::{Ipv4Addr, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(10);

fn start(aovs: bool, multi_frame: bool) -> (Receiver, Arc<RecordingDisplay>) {
    let display = Arc::new(RecordingDisplay::new());
    let options = ReceiverOptions {
        port: 0,
        aovs_enabled: aovs,
        multi_frame_enabled: multi_frame,
    };
    let mut receiver = Receiver::new(options, display.clone());
    receiver.start().unwrap();
    (receiver, display)
}

fn connect(receiver: &Receiver) -> Client {
    let port = receiver.local_addr().unwrap().port();
    Client::connect_to(SocketAddr::from((Ipv4Addr::LOCALHOST, port))).unwrap()
}

fn open(frame: f64, width: i32, height: i32) -> OpenImage {
    OpenImage {
        width,
        height,
        region_area: width as i64 * height as i64,
        renderer_version: 5000200,
        camera_fov: 45.0,
        camera_matrix: Matrix4x4::translate(0.0, 1.0, 2.0),
        frame,
    }
}

fn bucket(name: &str, x: i32, y: i32, w: i32, h: i32, spp: i32, value: f32) -> BucketData {
    BucketData {
        aov_name: String::from(name),
        bucket_x: x,
        bucket_y: y,
        bucket_w: w,
        bucket_h: h,
        samples_per_pixel: spp,
        ram_bytes: 64 << 20,
        elapsed_ms: 2000,
        pixels: vec![value; (w * h * spp) as usize],
    }
}

fn wait_progress(display: &RecordingDisplay, frame: f64, progress: i32) -> bool {
    display.wait_until(
        |events| {
            events
                .iter()
                .any(|e| *e == DisplayEvent::ProgressChanged { frame, progress })
        },
        TIMEOUT,
    )
}

/// Four 4x4 buckets tiling an 8x8 image.
fn send_frame(client: &mut Client, frame: f64, name: &str, value: f32) {
    client.open_image(open(frame, 8, 8)).unwrap();
    for (x, y) in [(0, 0), (4, 0), (0, 4), (4, 4)] {
        client.send_bucket(bucket(name, x, y, 4, 4, 4, value)).unwrap();
    }
    client.close_image().unwrap();
}

#[test]
fn progress_reaches_100_on_exact_tiling() {
    let (mut receiver, display) = start(false, false);
    let mut client = connect(&receiver);
    send_frame(&mut client, 1.0, "RGBA", 0.5);
    assert!(wait_progress(&display, 1.0, 100));

    let progress: Vec<i32> = display
        .events()
        .iter()
        .filter_map(|e| match e {
            DisplayEvent::ProgressChanged { progress, .. } => Some(*progress),
            _ => None,
        })
        .collect();
    assert_eq!(progress, vec![25, 50, 75, 100]);

    let stats = receiver.frame_buffer_stats(1.0).unwrap();
    assert_eq!(stats.progress_pct, 100);
    assert_eq!(stats.width, 8);
    assert_eq!(stats.channel_count, 1);
    assert_eq!(stats.ram_bytes, 64 << 20);
    assert!(stats.ready);

    let rgba = Channel::new("RGBA", 0);
    assert_eq!(receiver.read_pixel(1.0, 0, 0, &rgba), 0.5);
    assert_eq!(receiver.read_pixel(1.0, 7, 7, &rgba), 0.5);
    assert_eq!(receiver.read_pixel(1.0, 8, 0, &rgba), 0.0);
    assert_eq!(receiver.read_pixel(1.0, 0, 0, &Channel::new("RGBA", 9)), 0.0);
    receiver.close_connection();
}

#[test]
fn buckets_are_flipped_and_notified() {
    let (mut receiver, display) = start(false, false);
    let mut client = connect(&receiver);
    client.open_image(open(1.0, 8, 8)).unwrap();
    // top-left bucket in renderer space
    client.send_bucket(bucket("RGBA", 0, 0, 4, 2, 4, 2.0)).unwrap();
    client.close_image().unwrap();
    assert!(display.wait_until(
        |events| events
            .iter()
            .any(|e| matches!(e, DisplayEvent::RegionUpdated(_))),
        TIMEOUT
    ));
    assert!(receiver.frame_buffer_stats(1.0).unwrap().ready);
    let events = display.events();
    assert!(events.contains(&DisplayEvent::RegionUpdated(Region::new(0, 6, 4, 8))));
    assert!(events.contains(&DisplayEvent::FormatChanged {
        width: 8,
        height: 8
    }));
    assert!(events.contains(&DisplayEvent::FrameChanged(1.0)));
    assert!(events.iter().any(|e| matches!(e, DisplayEvent::CameraChanged { .. })));

    let rgba = Channel::new("RGBA", 0);
    assert_eq!(receiver.read_pixel(1.0, 0, 7, &rgba), 2.0);
    assert_eq!(receiver.read_pixel(1.0, 3, 6, &rgba), 2.0);
    assert_eq!(receiver.read_pixel(1.0, 0, 5, &rgba), 0.0);
    assert_eq!(receiver.read_pixel(1.0, 0, 0, &rgba), 0.0);

    let mut row = [9.0; 6];
    receiver.read_row(1.0, 7, 2, &mut row, &rgba);
    assert_eq!(row, [2.0, 2.0, 0.0, 0.0, 0.0, 0.0]);

    let camera = receiver.camera(1.0).unwrap();
    assert_eq!(camera.fov, 45.0);
    assert_eq!(camera.matrix.translation(), [0.0, 1.0, 2.0]);
    receiver.close_connection();
}

#[test]
fn extra_aovs_are_ignored_when_disabled() {
    let (mut receiver, display) = start(false, false);
    let mut client = connect(&receiver);
    client.open_image(open(1.0, 8, 8)).unwrap();
    for name in ["RGBA", "N", "Z"] {
        for (x, y) in [(0, 0), (4, 0), (0, 4), (4, 4)] {
            client.send_bucket(bucket(name, x, y, 4, 4, 4, 1.0)).unwrap();
        }
    }
    client.close_image().unwrap();
    drop(client);
    assert!(wait_progress(&display, 1.0, 100));

    // the trailing buckets may still be in flight; a second pass syncs with them
    let mut client = connect(&receiver);
    send_frame(&mut client, 2.0, "RGBA", 3.0);
    assert!(wait_progress(&display, 2.0, 100));
    assert_eq!(receiver.channel_names(2.0), vec!["RGBA".to_string()]);
    assert_eq!(
        receiver.read_pixel(2.0, 1, 1, &Channel::new("N", 0)),
        3.0
    );
    receiver.close_connection();
}

#[test]
fn aovs_are_kept_when_enabled() {
    let (mut receiver, display) = start(true, false);
    let mut client = connect(&receiver);
    client.open_image(open(1.0, 8, 8)).unwrap();
    for (x, y) in [(0, 0), (4, 0), (0, 4), (4, 4)] {
        client.send_bucket(bucket("RGBA", x, y, 4, 4, 4, 1.0)).unwrap();
        client.send_bucket(bucket("N", x, y, 4, 4, 3, -1.0)).unwrap();
    }
    // overlaps the first bucket; only here so the last N bucket is followed by a notification
    client.send_bucket(bucket("RGBA", 0, 0, 4, 4, 4, 1.0)).unwrap();
    client.close_image().unwrap();
    assert!(display.wait_until(
        |events| events
            .iter()
            .filter(|e| matches!(e, DisplayEvent::RegionUpdated(_)))
            .count()
            == 5,
        TIMEOUT
    ));
    assert_eq!(receiver.read_pixel(1.0, 7, 0, &Channel::new("N", 2)), -1.0);
    assert_eq!(receiver.frame_buffer_stats(1.0).unwrap().progress_pct, 100);
    assert_eq!(
        receiver.channel_names(1.0),
        vec!["RGBA".to_string(), "N".to_string()]
    );
    assert_eq!(receiver.read_pixel(1.0, 0, 0, &Channel::new("RGBA", 3)), 1.0);
    assert_eq!(receiver.read_pixel(1.0, 0, 0, &Channel::new("N", 0)), -1.0);
    assert_eq!(receiver.read_pixel(1.0, 0, 0, &Channel::new("Z", 0)), 0.0);
    assert_eq!(receiver.frame_buffer_stats(1.0).unwrap().channel_count, 2);
    receiver.close_connection();
}

#[test]
fn frames_are_selected_by_number() {
    let (mut receiver, display) = start(false, true);
    for (frame, value) in [(2.0, 2.0), (5.0, 5.0), (8.0, 8.0)] {
        let mut client = connect(&receiver);
        send_frame(&mut client, frame, "RGBA", value);
        assert!(wait_progress(&display, frame, 100));
    }
    let rgba = Channel::new("RGBA", 0);
    assert_eq!(receiver.frames(), vec![2.0, 5.0, 8.0]);
    assert_eq!(receiver.read_pixel(5.0, 1, 1, &rgba), 5.0);
    assert_eq!(receiver.read_pixel(6.0, 1, 1, &rgba), 5.0);
    assert_eq!(receiver.read_pixel(1.0, 1, 1, &rgba), 2.0);
    assert_eq!(receiver.read_pixel(100.0, 1, 1, &rgba), 8.0);

    let stats = receiver.frame_buffer_stats(6.0).unwrap();
    assert_eq!(stats.frame, 5.0);
    assert_eq!(stats.frame_count, 3);
    let status = receiver.status_line(6.0).unwrap();
    assert!(status.contains("Frame: 0005 (3)"), "{}", status);
    assert!(status.contains("Progress: 100%"), "{}", status);

    receiver.clear_all();
    assert!(receiver.frames().is_empty());
    assert_eq!(receiver.read_pixel(5.0, 1, 1, &rgba), 0.0);
    receiver.close_connection();
}

#[test]
fn single_frame_mode_follows_latest_pass() {
    let (mut receiver, display) = start(false, false);
    for (frame, value) in [(1.0, 1.0), (2.0, 2.0)] {
        let mut client = connect(&receiver);
        send_frame(&mut client, frame, "RGBA", value);
        assert!(wait_progress(&display, frame, 100));
    }
    assert_eq!(receiver.frames(), vec![2.0]);
    assert_eq!(receiver.read_pixel(1.0, 0, 0, &Channel::new("RGBA", 0)), 2.0);
    receiver.close_connection();
}

#[test]
fn survives_malformed_and_truncated_streams() {
    let (mut receiver, display) = start(false, false);
    let port = receiver.local_addr().unwrap().port();
    {
        let mut stream = TcpStream::connect((Ipv4Addr::LOCALHOST, port)).unwrap();
        stream.write_all(&42_i32.to_le_bytes()).unwrap();
    }
    {
        let mut bytes = encode_packet(&Packet::from(open(1.0, 8, 8)));
        bytes.extend(encode_packet(&Packet::from(bucket("RGBA", 0, 0, 4, 4, 4, 1.0))));
        bytes.truncate(bytes.len() - 10);
        let mut stream = TcpStream::connect((Ipv4Addr::LOCALHOST, port)).unwrap();
        stream.write_all(&bytes).unwrap();
    }
    let mut client = connect(&receiver);
    send_frame(&mut client, 3.0, "RGBA", 7.0);
    assert!(wait_progress(&display, 3.0, 100));
    assert_eq!(receiver.read_pixel(3.0, 5, 5, &Channel::new("RGBA", 0)), 7.0);
    assert!(receiver.is_connected());
    receiver.close_connection();
}

#[test]
fn single_bucket_frame_is_readable() {
    let (mut receiver, display) = start(false, false);
    let mut client = connect(&receiver);
    client.open_image(open(1.0, 4, 4)).unwrap();
    client.send_bucket(bucket("RGBA", 0, 0, 4, 4, 4, 0.75)).unwrap();
    client.close_image().unwrap();
    assert!(wait_progress(&display, 1.0, 100));
    let stats = receiver.frame_buffer_stats(1.0).unwrap();
    assert!(stats.ready);
    assert_eq!(receiver.read_pixel(1.0, 3, 3, &Channel::new("RGBA", 0)), 0.75);
    receiver.close_connection();
}

#[test]
fn out_of_range_values_do_not_stop_the_receiver() {
    let (mut receiver, display) = start(false, false);
    let mut client = connect(&receiver);
    let mut huge = open(1.0, 8, 8);
    huge.region_area = i64::MAX / 10;
    client.open_image(huge).unwrap();
    client
        .send_bucket(bucket("RGBA", i32::MAX - 1, 0, 4, 4, 4, 1.0))
        .unwrap();
    client.send_bucket(bucket("RGBA", 0, 0, 4, 4, 4, 1.0)).unwrap();
    client.open_image(open(2.0, i32::MAX, i32::MAX)).unwrap();
    client.close_image().unwrap();
    drop(client);
    assert!(wait_progress(&display, 1.0, 0));

    let mut client = connect(&receiver);
    send_frame(&mut client, 3.0, "RGBA", 6.0);
    assert!(wait_progress(&display, 3.0, 100));
    assert!(receiver.is_connected());
    assert_eq!(receiver.frames(), vec![3.0]);
    assert_eq!(receiver.read_pixel(3.0, 6, 6, &Channel::new("RGBA", 0)), 6.0);
    receiver.close_connection();
}

#[test]
fn bucket_before_open_is_dropped() {
    let (mut receiver, display) = start(false, false);
    let mut client = connect(&receiver);
    client.send_bucket(bucket("RGBA", 0, 0, 4, 4, 4, 1.0)).unwrap();
    client.close_image().unwrap();
    drop(client);
    let mut client = connect(&receiver);
    send_frame(&mut client, 1.0, "RGBA", 4.0);
    assert!(wait_progress(&display, 1.0, 100));
    assert_eq!(display.count(|e| matches!(e, DisplayEvent::RegionUpdated(_))), 4);
    receiver.close_connection();
}

#[test]
fn buckets_are_visible_all_or_nothing() {
    let (mut receiver, display) = start(false, false);
    let receiver_ref = &receiver;
    let done = AtomicBool::new(false);
    const PASSES: i32 = 200;
    std::thread::scope(|s| {
        let reader = s.spawn(|| {
            let rgba = Channel::new("RGBA", 0);
            let region = Region::new(0, 0, 32, 32);
            let mut reads = 0;
            while !done.load(Ordering::Acquire) {
                let values = receiver_ref.read_region(1.0, &region, &rgba);
                let first = values[0];
                assert!(values.iter().all(|v| *v == first), "torn bucket");
                reads += 1;
            }
            reads
        });
        let mut client = connect(receiver_ref);
        client.open_image(open(1.0, 32, 32)).unwrap();
        for k in 0..PASSES {
            client
                .send_bucket(bucket("RGBA", 0, 0, 32, 32, 4, k as f32))
                .unwrap();
        }
        client.close_image().unwrap();
        assert!(display.wait_until(
            |events| events
                .iter()
                .filter(|e| matches!(e, DisplayEvent::RegionUpdated(_)))
                .count()
                == PASSES as usize,
            TIMEOUT
        ));
        done.store(true, Ordering::Release);
        assert!(reader.join().unwrap() > 0);
    });
    assert_eq!(
        receiver.read_pixel(1.0, 31, 31, &Channel::new("RGBA", 0)),
        (PASSES - 1) as f32
    );
    receiver.close_connection();
}

#[test]
fn close_connection_unblocks_stalled_client() {
    let (mut receiver, display) = start(false, false);
    let mut client = connect(&receiver);
    client.open_image(open(1.0, 8, 8)).unwrap();
    client.flush().unwrap();
    assert!(display.wait_until(
        |events| events.contains(&DisplayEvent::FrameChanged(1.0)),
        TIMEOUT
    ));
    // the client never closes its image
    receiver.close_connection();
    assert!(!receiver.is_connected());
    assert!(receiver.local_addr().is_none());
}

#[test]
fn terminate_from_client_ends_session() {
    let (mut receiver, _display) = start(false, false);
    let mut client = connect(&receiver);
    client.terminate().unwrap();
    receiver.wait();
    assert!(!receiver.is_connected());
}

#[test]
fn reopening_on_a_new_port() {
    let (mut receiver, display) = start(false, false);
    let first = receiver.local_addr().unwrap().port();
    receiver.open_connection(0).unwrap();
    let second = receiver.local_addr().unwrap().port();
    assert!(receiver.is_connected());
    assert!(TcpStream::connect((Ipv4Addr::LOCALHOST, first)).is_err() || first == second);
    let mut client = connect(&receiver);
    send_frame(&mut client, 1.0, "RGBA", 1.0);
    assert!(wait_progress(&display, 1.0, 100));
    receiver.close_connection();
}

#[test]
fn bind_failure_is_reported() {
    let taken = TcpListener::bind((Ipv4Addr::UNSPECIFIED, 0)).unwrap();
    let port = taken.local_addr().unwrap().port();
    let display = Arc::new(RecordingDisplay::new());
    let mut receiver = Receiver::new(ReceiverOptions::default(), display.clone());
    let r = receiver.open_connection(port);
    match r {
        Err(AtonError::Connect { port: p, .. }) => assert_eq!(p, port),
        other => panic!("unexpected {:?}", other.is_ok()),
    }
    assert_eq!(
        display.count(|e| matches!(e, DisplayEvent::ConnectError(_))),
        1
    );
    assert!(!receiver.is_connected());
}
