use aton_receiver::core::aton::*;
use aton_receiver::displays::RecordingDisplay;
use aton_receiver::senders::*;

use std::sync::Arc;

#[test]
fn synthetic_sender_round_trip() {
    let display = Arc::new(RecordingDisplay::new());
    let options = ReceiverOptions {
        port: 0,
        aovs_enabled: true,
        multi_frame_enabled: true,
    };
    let mut receiver = Receiver::new(options, display.clone());
    receiver.start().unwrap();
    let port = receiver.local_addr().unwrap().port();

    let sender = SyntheticSender::new(SenderOptions {
        address: format!("127.0.0.1:{}", port),
        width: 40,
        height: 30,
        bucket_size: 16,
        aovs: vec![String::from("RGBA"), String::from("Z")],
        frames: vec![1.0, 2.0],
        passes: 2,
        terminate: true,
        ..SenderOptions::default()
    });
    let summary = sender.run().unwrap();
    assert_eq!(summary.connections, 2 * 2 + 1);
    assert_eq!(summary.buckets, 2 * 2 * 2 * 6);

    // Terminate is handled after every earlier connection
    receiver.wait();
    assert_eq!(receiver.frames(), vec![1.0, 2.0]);
    assert_eq!(
        receiver.channel_names(2.0),
        vec!["RGBA".to_string(), "Z".to_string()]
    );
    let stats = receiver.frame_buffer_stats(2.0).unwrap();
    assert_eq!(stats.progress_pct, 100);
    assert_eq!(stats.width, 40);
    assert_eq!(stats.height, 30);
    assert!(stats.ready);
    // last pass has full weight: alpha is 1 everywhere
    assert_eq!(receiver.read_pixel(2.0, 39, 29, &Channel::new("RGBA", 3)), 1.0);
    assert!(receiver.read_pixel(1.0, 0, 0, &Channel::new("Z", 0)) > 1.0);
    assert!(!display.events().is_empty());
}
