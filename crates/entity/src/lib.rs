pub mod attendance_record;
pub mod employee;
pub mod job_posting;
pub mod leave_request;
pub mod payroll_record;
pub mod performance_review;
pub mod user;
pub mod user_role;
pub mod user_secret;
