mod alumni;
mod evaluation;
mod feedback;
mod internship;
mod mentor;
mod parent;
mod password_log;
mod progress;
mod report;
mod student;
mod user;

pub use alumni::{AlumniDetails, AlumniRelation};
pub use evaluation::{Evaluation, NewEvaluation};
pub use feedback::{
    MentorFeedback, NewMentorFeedback, NewWeeklyFeedback, WeeklyFeedback, WeeklyFeedbackUpsert,
};
pub use internship::{Internship, InternshipDetails, InternshipType, UnknownInternshipType};
pub use mentor::{Mentor, MentorSummary, NewMentor};
pub use parent::{Parent, ParentChanges};
pub use password_log::PasswordChangeLog;
pub use progress::{NewProgressEntry, ProgressEntry, ProgressReport, overall_progress};
pub use report::{Report, ReportType, UnknownReportType, WeeklyReport};
pub use student::{NewStudent, Student, StudentChanges};
pub use user::{NewUser, User};
