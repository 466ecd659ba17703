//! Single-character permission flags.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::UserError;

/// A permission flag a user may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Flag {
    Siteop,
    Gadmin,
    Glock,
    Exempt,
    Color,
    Deleted,
    Useredit,
    Anonymous,
    Nuke,
    Unnuke,
    Undupe,
    Kick,
    Kill,
    Take,
    Give,
    Users,
    Idler,
    Custom1,
    Custom2,
    Custom3,
    Custom4,
    Custom5,
}

impl Flag {
    pub const ALL: [Flag; 22] = [
        Flag::Siteop,
        Flag::Gadmin,
        Flag::Glock,
        Flag::Exempt,
        Flag::Color,
        Flag::Deleted,
        Flag::Useredit,
        Flag::Anonymous,
        Flag::Nuke,
        Flag::Unnuke,
        Flag::Undupe,
        Flag::Kick,
        Flag::Kill,
        Flag::Take,
        Flag::Give,
        Flag::Users,
        Flag::Idler,
        Flag::Custom1,
        Flag::Custom2,
        Flag::Custom3,
        Flag::Custom4,
        Flag::Custom5,
    ];

    pub fn as_char(self) -> char {
        match self {
            Flag::Siteop => '1',
            Flag::Gadmin => '2',
            Flag::Glock => '3',
            Flag::Exempt => '4',
            Flag::Color => '5',
            Flag::Deleted => '6',
            Flag::Useredit => '7',
            Flag::Anonymous => '8',
            Flag::Nuke => 'A',
            Flag::Unnuke => 'B',
            Flag::Undupe => 'C',
            Flag::Kick => 'D',
            Flag::Kill => 'E',
            Flag::Take => 'F',
            Flag::Give => 'G',
            Flag::Users => 'H',
            Flag::Idler => 'I',
            Flag::Custom1 => 'J',
            Flag::Custom2 => 'K',
            Flag::Custom3 => 'L',
            Flag::Custom4 => 'M',
            Flag::Custom5 => 'N',
        }
    }

    pub fn from_char(c: char) -> Option<Flag> {
        Flag::ALL.into_iter().find(|f| f.as_char() == c)
    }

    pub fn description(self) -> &'static str {
        match self {
            Flag::Siteop => "siteop",
            Flag::Gadmin => "gadmin",
            Flag::Glock => "glock",
            Flag::Exempt => "exempt",
            Flag::Color => "color",
            Flag::Deleted => "deleted",
            Flag::Useredit => "useredit",
            Flag::Anonymous => "anonymous",
            Flag::Nuke => "nuke",
            Flag::Unnuke => "unnuke",
            Flag::Undupe => "undupe",
            Flag::Kick => "kick",
            Flag::Kill => "kill",
            Flag::Take => "take",
            Flag::Give => "give",
            Flag::Users => "users",
            Flag::Idler => "idler",
            Flag::Custom1 => "custom1",
            Flag::Custom2 => "custom2",
            Flag::Custom3 => "custom3",
            Flag::Custom4 => "custom4",
            Flag::Custom5 => "custom5",
        }
    }
}

/// A sorted, duplicate-free set of flags, serialized as a string like `"14A"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Flags(Vec<Flag>);

impl Flags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a flag string. Order and repetition in the input do not matter.
    pub fn parse(s: &str) -> Result<Self, UserError> {
        let mut flags = Vec::with_capacity(s.len());
        for c in s.chars() {
            let flag = Flag::from_char(c).ok_or_else(|| UserError::InvalidFlags {
                flags: s.to_string(),
                reason: format!("unknown flag {c:?}"),
            })?;
            flags.push(flag);
        }
        flags.sort();
        flags.dedup();
        Ok(Self(flags))
    }

    pub fn contains(&self, flag: Flag) -> bool {
        self.0.binary_search(&flag).is_ok()
    }

    pub fn contains_any(&self, other: &Flags) -> bool {
        other.iter().any(|f| self.contains(f))
    }

    pub fn insert(&mut self, flag: Flag) {
        if let Err(pos) = self.0.binary_search(&flag) {
            self.0.insert(pos, flag);
        }
    }

    pub fn remove(&mut self, flag: Flag) {
        self.0.retain(|f| *f != flag);
    }

    pub fn insert_all(&mut self, other: &Flags) {
        self.0.extend(other.iter());
        self.0.sort();
        self.0.dedup();
    }

    pub fn remove_all(&mut self, other: &Flags) {
        self.0.retain(|f| !other.contains(*f));
    }

    pub fn iter(&self) -> impl Iterator<Item = Flag> + '_ {
        self.0.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for flag in &self.0 {
            write!(f, "{}", flag.as_char())?;
        }
        Ok(())
    }
}

impl TryFrom<String> for Flags {
    type Error = UserError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Flags::parse(&s)
    }
}

impl From<Flags> for String {
    fn from(flags: Flags) -> Self {
        flags.to_string()
    }
}
