pub mod courses;
pub mod lessons;
pub mod modules;
pub mod quizzes;
