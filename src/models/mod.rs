pub mod company;
pub mod hourly;
pub mod product;
pub mod task;
pub mod tsd;
pub mod user;

pub use company::{Company, CompanyEmployees};
pub use hourly::{HourlyData, Shift};
pub use product::Product;
pub use task::{Task, TaskInput, TaskStatus};
pub use tsd::{TsdStatus, TsdTransaction};
pub use user::{Role, User, UserInput};
