use std::{fmt, str::FromStr};

use crate::foundation::error::{ChanError, ChanResult};

/// One of the three colour planes of an image.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Red,
    Green,
    Blue,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Red, Channel::Green, Channel::Blue];

    pub fn name(self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Green => "green",
            Self::Blue => "blue",
        }
    }

    /// Stable slot used by per-channel tables (identity graph rows).
    pub(crate) fn slot(self) -> usize {
        match self {
            Self::Red => 0,
            Self::Green => 1,
            Self::Blue => 2,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Channel {
    type Err = ChanError;

    fn from_str(s: &str) -> ChanResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "red" | "r" => Ok(Self::Red),
            "green" | "g" => Ok(Self::Green),
            "blue" | "b" => Ok(Self::Blue),
            other => Err(ChanError::parameter(format!("unknown channel '{other}'"))),
        }
    }
}

/// Which named channel backs each physical plane of a [`crate::PixelBuffer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "[Channel; 3]", into = "[Channel; 3]")]
pub struct ChannelOrder([Channel; 3]);

impl Default for ChannelOrder {
    fn default() -> Self {
        Self(Channel::ALL)
    }
}

impl ChannelOrder {
    pub fn new(order: [Channel; 3]) -> ChanResult<Self> {
        let [a, b, c] = order;
        if a == b || b == c || a == c {
            return Err(ChanError::parameter(format!(
                "channel order must name three distinct channels, got [{a}, {b}, {c}]"
            )));
        }
        Ok(Self(order))
    }

    pub fn channels(&self) -> [Channel; 3] {
        self.0
    }

    pub fn at(&self, index: usize) -> Option<Channel> {
        self.0.get(index).copied()
    }

    /// Plane index currently holding `channel`.
    pub fn position(&self, channel: Channel) -> usize {
        // Every channel appears exactly once, enforced by `new`.
        self.0.iter().position(|&c| c == channel).unwrap_or(0)
    }

    pub(crate) fn swap(&mut self, i: usize, j: usize) {
        self.0.swap(i, j);
    }
}

impl TryFrom<[Channel; 3]> for ChannelOrder {
    type Error = ChanError;

    fn try_from(order: [Channel; 3]) -> ChanResult<Self> {
        Self::new(order)
    }
}

impl From<ChannelOrder> for [Channel; 3] {
    fn from(order: ChannelOrder) -> Self {
        order.0
    }
}

impl fmt::Display for ChannelOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c] = self.0;
        write!(f, "[{a}, {b}, {c}]")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Towards index 0.
    Up,
    /// Towards the last index.
    Down,
}

impl FromStr for Direction {
    type Err = ChanError;

    fn from_str(s: &str) -> ChanResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            other => Err(ChanError::parameter(format!("unknown direction '{other}'"))),
        }
    }
}

/// Ordered set of distinct channels, as selected by the user.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "Vec<Channel>", into = "Vec<Channel>")]
pub struct ChannelSet(Vec<Channel>);

impl ChannelSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        Self(Channel::ALL.to_vec())
    }

    pub fn insert(&mut self, channel: Channel) -> bool {
        if self.0.contains(&channel) {
            return false;
        }
        self.0.push(channel);
        true
    }

    pub fn contains(&self, channel: Channel) -> bool {
        self.0.contains(&channel)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Channel> + '_ {
        self.0.iter().copied()
    }

    /// Parse channel names, rejecting unknown names and duplicates.
    pub fn parse<S: AsRef<str>>(names: &[S]) -> ChanResult<Self> {
        let mut set = Self::new();
        for name in names {
            let channel: Channel = name.as_ref().parse()?;
            if !set.insert(channel) {
                return Err(ChanError::selection(format!(
                    "channel '{channel}' selected twice"
                )));
            }
        }
        Ok(set)
    }
}

impl FromIterator<Channel> for ChannelSet {
    fn from_iter<I: IntoIterator<Item = Channel>>(iter: I) -> Self {
        let mut set = Self::new();
        for c in iter {
            set.insert(c);
        }
        set
    }
}

impl TryFrom<Vec<Channel>> for ChannelSet {
    type Error = ChanError;

    fn try_from(v: Vec<Channel>) -> ChanResult<Self> {
        let mut set = Self::new();
        for c in v {
            if !set.insert(c) {
                return Err(ChanError::selection(format!("channel '{c}' selected twice")));
            }
        }
        Ok(set)
    }
}

impl From<ChannelSet> for Vec<Channel> {
    fn from(set: ChannelSet) -> Self {
        set.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_parses_aliases() {
        assert_eq!("RED".parse::<Channel>().unwrap(), Channel::Red);
        assert_eq!(" g ".parse::<Channel>().unwrap(), Channel::Green);
        assert!("alpha".parse::<Channel>().is_err());
    }

    #[test]
    fn order_rejects_duplicates() {
        assert!(ChannelOrder::new([Channel::Red, Channel::Red, Channel::Blue]).is_err());
        let order = ChannelOrder::new([Channel::Blue, Channel::Red, Channel::Green]).unwrap();
        assert_eq!(order.position(Channel::Green), 2);
        assert_eq!(order.to_string(), "[blue, red, green]");
    }

    #[test]
    fn channel_set_rejects_repeats() {
        assert!(ChannelSet::parse(&["red", "r"]).is_err());
        let set = ChannelSet::parse(&["blue", "red"]).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.contains(Channel::Red));
        assert!(!set.contains(Channel::Green));
    }

    #[test]
    fn channel_set_serde_is_a_name_list() {
        let set: ChannelSet = serde_json::from_str(r#"["green","blue"]"#).unwrap();
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![Channel::Green, Channel::Blue]);
        assert!(serde_json::from_str::<ChannelSet>(r#"["green","green"]"#).is_err());
    }
}
