use crate::{
    buffer::{ImageState, PixelBuffer},
    foundation::core::{Channel, ChannelSet, Direction},
    foundation::error::{ChanError, ChanResult},
};

/// Swap `channel` with its neighbour in `direction`, moving the plane data with it.
///
/// At either boundary the state is returned unchanged.
pub fn move_channel(state: &ImageState, channel: Channel, direction: Direction) -> ImageState {
    let idx = state.order.position(channel);
    let target = match direction {
        Direction::Up if idx > 0 => idx - 1,
        Direction::Down if idx < 2 => idx + 1,
        _ => return state.clone(),
    };

    let mut perm = [0usize, 1, 2];
    perm.swap(idx, target);
    let mut order = state.order;
    order.swap(idx, target);

    ImageState {
        buffer: state.buffer.permuted(perm),
        order,
        identity: state.identity.clone(),
    }
}

/// Move every selected channel one step in `direction`.
///
/// Channels are processed in order of position, from the far end for `Down`.
/// A channel already at the boundary stays put and may be passed by a selected
/// neighbour.
#[tracing::instrument(skip(state))]
pub fn move_channels(
    state: &ImageState,
    channels: &ChannelSet,
    direction: Direction,
) -> ChanResult<ImageState> {
    if channels.is_empty() {
        return Err(ChanError::selection("select at least one channel to move"));
    }

    let mut selected: Vec<(usize, Channel)> = channels
        .iter()
        .map(|c| (state.order.position(c), c))
        .collect();
    selected.sort_unstable();
    if direction == Direction::Down {
        selected.reverse();
    }

    let mut out = state.clone();
    for (_, channel) in selected {
        out = move_channel(&out, channel, direction);
    }
    tracing::debug!(order = %out.order, "channels moved");
    Ok(out)
}

#[derive(Clone, Debug, PartialEq)]
pub enum FlattenOutcome {
    Applied(ImageState),
    /// The selection was already identical; nothing changed.
    NoOp,
}

impl FlattenOutcome {
    pub fn is_noop(&self) -> bool {
        matches!(self, Self::NoOp)
    }

    pub fn applied(self) -> Option<ImageState> {
        match self {
            Self::Applied(s) => Some(s),
            Self::NoOp => None,
        }
    }
}

/// Merge the selected channels into their per-pixel quadratic mean.
///
/// Every selected plane receives the same merged values, so the selection becomes
/// mutually identical.
#[tracing::instrument(skip(state))]
pub fn flatten(state: &ImageState, channels: &ChannelSet) -> ChanResult<FlattenOutcome> {
    if channels.len() < 2 {
        return Err(ChanError::selection(
            "select at least two channels to flatten",
        ));
    }
    if state.identity.all_identical(channels) {
        tracing::debug!("flatten skipped: selection already identical");
        return Ok(FlattenOutcome::NoOp);
    }

    let positions: Vec<usize> = channels.iter().map(|c| state.order.position(c)).collect();
    let n = positions.len() as f64;
    let merged: Vec<u8> = (0..state.buffer.sample_count())
        .map(|i| {
            let sum_sq: f64 = positions
                .iter()
                .map(|&p| f64::from(state.buffer.plane(p)[i]).powi(2))
                .sum();
            (sum_sq / n).sqrt().round().clamp(0.0, 255.0) as u8
        })
        .collect();

    let mut buffer: PixelBuffer = state.buffer.clone();
    for &p in &positions {
        buffer = buffer.with_plane(p, merged.clone())?;
    }

    Ok(FlattenOutcome::Applied(ImageState {
        buffer,
        order: state.order,
        identity: state.identity.after_flatten(channels),
    }))
}
