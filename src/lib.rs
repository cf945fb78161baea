pub mod actor;
pub mod csv;
pub mod game;
pub mod model;
mod money;

pub use actor::{MatchCommand, MatchHandle, MatchPorts, ServerEvent, spawn_match};
pub use game::{ContrabandGame, GameError, MatchSnapshot};
pub use model::{MatchId, PlayerId, TeamRole};
pub use money::{Money, MoneyError};
