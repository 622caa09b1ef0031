// 导师分配
// 分配状态机与数据库登记表

mod registry;
mod types;

pub use registry::AssignmentRegistry;
pub use types::{Assignment, AssignmentOutcome, AssignmentState, AssignmentView, Transition};
