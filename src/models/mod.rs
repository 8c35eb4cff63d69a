pub mod activity;
pub mod goal;
pub mod profile;
pub mod wellness;

pub use activity::{ActivityRecord, GeoPoint, NewActivityRecord};
pub use goal::{GoalPeriod, GoalType, NewUserGoal, UserGoal};
pub use profile::{Units, UserProfile};
pub use wellness::{SleepRecord, WeightRecord};
