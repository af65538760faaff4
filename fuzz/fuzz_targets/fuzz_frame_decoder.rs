#![no_main]

use libfuzzer_sys::fuzz_target;
use ocean_saver_client::frame::{decode_frame, FrameDecoder};

fuzz_target!(|data: &[u8]| {
    // The first byte picks a chunk size so the same body is also fed in
    // pieces; both feeds must yield the same frames.
    let Some((&split, body)) = data.split_first() else {
        return;
    };
    let chunk_size = usize::from(split).max(1);

    let mut whole = FrameDecoder::new();
    let expected = whole.push(body);

    let mut pieces = FrameDecoder::new();
    let mut frames = Vec::new();
    for chunk in body.chunks(chunk_size) {
        frames.extend(pieces.push(chunk));
    }

    assert_eq!(frames, expected);
    assert_eq!(pieces.buffered_len(), whole.buffered_len());

    for frame in &frames {
        let _ = decode_frame(frame);
    }
});
