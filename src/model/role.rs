use strum_macros::{Display, EnumString};

/// Caller role as forwarded by the gateway. Officers act on their own
/// records; supervisors and admins resolve corrections and manage slots.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Display, EnumString)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Role {
    Officer,
    Supervisor,
    Admin,
}
