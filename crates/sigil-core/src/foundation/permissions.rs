//! Permission bit set.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

/// A set of platform permission bits.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permissions(pub u64);

macro_rules! permission_bits {
    ($($name:ident = $bit:expr),* $(,)?) => {
        impl Permissions {
            $(pub const $name: Permissions = Permissions(1 << $bit);)*

            const NAMED: &'static [(Permissions, &'static str)] = &[
                $((Permissions::$name, stringify!($name)),)*
            ];
        }
    };
}

permission_bits! {
    CREATE_INSTANT_INVITE = 0,
    KICK_MEMBERS = 1,
    BAN_MEMBERS = 2,
    ADMINISTRATOR = 3,
    MANAGE_CHANNELS = 4,
    MANAGE_GUILD = 5,
    ADD_REACTIONS = 6,
    VIEW_AUDIT_LOG = 7,
    VIEW_CHANNEL = 10,
    SEND_MESSAGES = 11,
    MANAGE_MESSAGES = 13,
    EMBED_LINKS = 14,
    ATTACH_FILES = 15,
    READ_MESSAGE_HISTORY = 16,
    MENTION_EVERYONE = 17,
    USE_EXTERNAL_EMOJIS = 18,
    CONNECT = 20,
    SPEAK = 21,
    MANAGE_ROLES = 28,
    MANAGE_WEBHOOKS = 29,
    MANAGE_THREADS = 34,
    SEND_MESSAGES_IN_THREADS = 38,
    MODERATE_MEMBERS = 40,
}

impl Permissions {
    /// The empty set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Raw bits.
    pub const fn bits(&self) -> u64 {
        self.0
    }

    /// Returns `true` if every bit of `other` is set.
    pub const fn contains(&self, other: Permissions) -> bool {
        self.0 & other.0 == other.0
    }

    /// Names of the bits of `required` that are not set here.
    ///
    /// Bits without a known name are reported as `UNKNOWN`.
    pub fn missing(&self, required: Permissions) -> Vec<&'static str> {
        let absent = required.0 & !self.0;
        if absent == 0 {
            return Vec::new();
        }

        let mut names = Vec::new();
        let mut known = 0;
        for (perm, name) in Self::NAMED {
            known |= perm.0;
            if absent & perm.0 != 0 {
                names.push(*name);
            }
        }
        if absent & !known != 0 {
            names.push("UNKNOWN");
        }
        names
    }
}

impl BitOr for Permissions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Permissions {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = Permissions::empty().missing(*self);
        write!(f, "Permissions({})", names.join(" | "))
    }
}
