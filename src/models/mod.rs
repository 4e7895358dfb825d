pub mod comment;
pub mod project;
pub mod task;
pub mod user;

pub use comment::{Comment, CommentInput, CommentView};
pub use project::{
    Project, ProjectDetail, ProjectInput, ProjectStats, ProjectSummary, ProjectUpdate,
    ProjectUpdated,
};
pub use task::{
    NewTask, Task, TaskFilter, TaskInput, TaskPriority, TaskQuery, TaskStatus, TaskUpdate,
    TaskView,
};
pub use user::{NewUser, User, UserSummary};
