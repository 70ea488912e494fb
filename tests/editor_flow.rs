use chanconv::{
    Channel, ChannelSet, ConvolveParams, Direction, EditOutcome, Editor, EngineConfig,
    InMemorySink, PixelBuffer, StrideMode,
};

fn config() -> EngineConfig {
    let mut cfg = EngineConfig::default();
    cfg.transition.duration_ms = 2;
    cfg
}

fn set(channels: &[Channel]) -> ChannelSet {
    channels.iter().copied().collect()
}

fn loaded(cfg: EngineConfig, buffer: PixelBuffer) -> (Editor, InMemorySink) {
    let mut editor = Editor::new(cfg).unwrap();
    let mut sink = InMemorySink::new();
    editor.load_buffer(buffer, &mut sink).unwrap();
    (editor, sink)
}

#[test]
fn padding_grows_every_plane_once_per_batch() {
    let (mut editor, mut sink) = loaded(config(), PixelBuffer::filled(3, 3, [100, 100, 100]));
    editor.stage_preset("mean-blur").unwrap();
    editor.stage_preset("gaussian-blur").unwrap();
    editor
        .convolve(
            &set(&[Channel::Red]),
            ConvolveParams {
                padding: 1,
                stride: 1,
            },
            true,
            &mut sink,
        )
        .unwrap();

    let buffer = &editor.state().unwrap().buffer;
    assert_eq!((buffer.width(), buffer.height()), (5, 5));
    // Unselected planes are padded but otherwise untouched.
    assert_eq!(buffer.sample(0, 0, 1), 0);
    assert_eq!(buffer.sample(2, 2, 1), 100);
    assert_eq!(buffer.sample(4, 4, 2), 0);
    assert_eq!(sink.last(), Some(buffer));
}

#[test]
fn padding_beyond_smallest_kernel_is_rejected() {
    let (mut editor, mut sink) = loaded(config(), PixelBuffer::filled(4, 4, [1, 2, 3]));
    editor.stage_preset("gaussian-blur-bigger").unwrap();
    editor.stage_preset("sobel-x").unwrap();
    let before = editor.state().unwrap().clone();
    let err = editor
        .convolve(
            &set(&[Channel::Green]),
            ConvolveParams {
                padding: 2,
                stride: 1,
            },
            false,
            &mut sink,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        chanconv::ChanError::InvalidPadding { padding: 2, max: 1 }
    ));
    assert_eq!(editor.state(), Some(&before));
    assert_eq!(sink.frames().len(), 1);
}

#[test]
fn identity_follows_flatten_and_convolve() {
    let buffer = PixelBuffer::new(
        2,
        2,
        [vec![10, 20, 30, 40], vec![40, 30, 20, 10], vec![5, 5, 5, 5]],
    )
    .unwrap();
    let (mut editor, mut sink) = loaded(config(), buffer);
    editor.stage_preset("mean-blur").unwrap();

    editor
        .flatten(&set(&[Channel::Red, Channel::Green]), &mut sink)
        .unwrap();
    assert_eq!(
        editor.identical(Channel::Red),
        set(&[Channel::Red, Channel::Green])
    );

    // Same kernel on both keeps them identical.
    editor
        .convolve(
            &set(&[Channel::Red, Channel::Green]),
            ConvolveParams::default(),
            true,
            &mut sink,
        )
        .unwrap();
    assert_eq!(
        editor.identical(Channel::Green),
        set(&[Channel::Red, Channel::Green])
    );
    let state = editor.state().unwrap();
    assert_eq!(state.channel_plane(Channel::Red), state.channel_plane(Channel::Green));

    editor
        .convolve(
            &set(&[Channel::Red]),
            ConvolveParams::default(),
            false,
            &mut sink,
        )
        .unwrap();
    assert_eq!(editor.identical(Channel::Red), set(&[Channel::Red]));
    assert_eq!(editor.identical(Channel::Green), set(&[Channel::Green]));
    assert!(editor.linked_channels().is_empty());
}

#[test]
fn identity_survives_moves() {
    let (mut editor, mut sink) = loaded(config(), PixelBuffer::filled(2, 1, [1, 9, 30]));
    editor
        .flatten(&set(&[Channel::Red, Channel::Blue]), &mut sink)
        .unwrap();
    editor
        .move_channels(&set(&[Channel::Blue]), Direction::Up, &mut sink)
        .unwrap();
    let state = editor.state().unwrap();
    assert_eq!(
        state.order.channels(),
        [Channel::Red, Channel::Blue, Channel::Green]
    );
    assert_eq!(state.channel_plane(Channel::Blue), state.channel_plane(Channel::Red));
    assert_eq!(
        editor.identical(Channel::Blue),
        set(&[Channel::Red, Channel::Blue])
    );
}

#[test]
fn decimating_stride_shrinks_all_planes() {
    let mut cfg = config();
    cfg.stride_mode = StrideMode::Decimate;
    let (mut editor, mut sink) = loaded(cfg, PixelBuffer::filled(4, 4, [60, 70, 80]));
    editor.stage_preset("mean-blur").unwrap();
    editor
        .convolve(
            &set(&[Channel::Red]),
            ConvolveParams {
                padding: 0,
                stride: 2,
            },
            true,
            &mut sink,
        )
        .unwrap();
    let buffer = &editor.state().unwrap().buffer;
    assert_eq!((buffer.width(), buffer.height()), (2, 2));
    assert_eq!(buffer.plane(0), &[60, 60, 60, 60]);
    assert_eq!(buffer.plane(2), &[80, 80, 80, 80]);
}

#[test]
fn holding_stride_keeps_shape() {
    let (mut editor, mut sink) = loaded(config(), PixelBuffer::filled(4, 4, [60, 70, 80]));
    editor.stage_preset("mean-blur").unwrap();
    let outcome = editor
        .convolve(
            &set(&[Channel::Blue]),
            ConvolveParams {
                padding: 0,
                stride: 2,
            },
            true,
            &mut sink,
        )
        .unwrap();
    assert!(matches!(outcome, EditOutcome::Changed(_)));
    let buffer = &editor.state().unwrap().buffer;
    assert_eq!((buffer.width(), buffer.height()), (4, 4));
    assert!(buffer.plane(2).iter().all(|&v| v == 80));
}

#[test]
fn staged_kernel_edits_apply() {
    let (mut editor, mut sink) = loaded(config(), PixelBuffer::filled(3, 3, [50, 50, 50]));
    let idx = editor.stage_empty(3, 3).unwrap();
    for row in 0..3 {
        for col in 0..3 {
            editor.set_kernel_cell(idx, row, col, "0").unwrap();
        }
    }
    editor.set_kernel_cell(idx, 1, 1, "2").unwrap();
    editor
        .convolve(
            &set(&[Channel::Green]),
            ConvolveParams::default(),
            false,
            &mut sink,
        )
        .unwrap();
    assert!(editor.state().unwrap().buffer.plane(1).iter().all(|&v| v == 100));

    editor.normalize_kernel(idx).unwrap();
    editor
        .convolve(
            &set(&[Channel::Green]),
            ConvolveParams::default(),
            false,
            &mut sink,
        )
        .unwrap();
    assert!(editor.state().unwrap().buffer.plane(1).iter().all(|&v| v == 100));

    editor.remove_kernel(idx).unwrap();
    assert!(editor.kernels().is_empty());
}
