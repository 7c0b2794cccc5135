use academy::Config;
use academy::generation::{CourseGenerator, CourseRequest};
use academy::model::detail::CourseDetail;
use academy::model::entity::{Course, CourseCreate, CourseStatus, UserEntity, UserEntityCreate};
use academy::model::{CrudRepository, DbConnection, ModelManager, PaginatableRepository};
use academy::web::{AuthenticatedUser, UserRole};
use clap::{Parser, Subcommand};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
enum CliError {
    #[error("config error: {0}")]
    Config(#[from] academy::ConfigError),
    #[error("database error: {0}")]
    Database(#[from] academy::model::DatabaseError),
    #[error("generation error: {0}")]
    Generation(#[from] academy::generation::GenerationError),
    #[error("crypt error: {0}")]
    Crypt(#[from] academy::auth::CryptError),
    #[error("user `{0}` not found")]
    UnknownUser(String),
    #[error("user `{0}` is not an administrator")]
    NotAdmin(String),
    #[error("course {0} not found")]
    UnknownCourse(Uuid),
}

type CliResult<T> = Result<T, CliError>;

#[derive(Parser, Debug)]
#[command(about = "CLI tool for managing the course database", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserCommands,
    },

    /// Manage courses
    Course {
        #[command(subcommand)]
        action: CourseCommands,
    },
}

/// User management
#[derive(Subcommand, Debug)]
pub enum UserCommands {
    Add {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        /// `admin` or `student`
        #[arg(long, default_value = "student")]
        role: String,
    },
}

/// Course management
#[derive(Subcommand, Debug)]
pub enum CourseCommands {
    /// Generate a draft course with the configured services
    Generate {
        /// Administrator the course is authored by
        #[arg(long)]
        owner: String,
        #[arg(long)]
        prompt: String,
        #[arg(long, default_value_t = 5)]
        modules: usize,
        #[arg(long, default_value_t = 3)]
        lessons: usize,
        #[arg(long, default_value_t = 0)]
        tests: usize,
    },
    /// Make a draft course visible to students
    Publish {
        #[arg(long)]
        id: Uuid,
    },
    /// Print the full course tree as JSON
    Show {
        #[arg(long)]
        id: Uuid,
    },
    List {
        #[arg(long, default_value_t = 20)]
        limit: i64,
        #[arg(long, default_value_t = 0)]
        offset: i64,
    },
}

async fn find_admin(mm: &ModelManager, username: &str) -> CliResult<AuthenticatedUser> {
    let user = UserEntity::find_by_username(mm, &AuthenticatedUser::admin(), username)
        .await?
        .ok_or_else(|| CliError::UnknownUser(username.to_string()))?;

    let actor = AuthenticatedUser::new(user.id(), user.role());
    if !actor.is_admin() {
        return Err(CliError::NotAdmin(username.to_string()));
    }
    Ok(actor)
}

async fn find_course(mm: &ModelManager, actor: &AuthenticatedUser, id: Uuid) -> CliResult<Course> {
    Course::find_by_id(mm, actor, id)
        .await?
        .ok_or(CliError::UnknownCourse(id))
}

async fn run(args: Cli) -> CliResult<()> {
    let config = Config::load(cfg!(debug_assertions))?;
    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| config.app().database_uri().to_string());

    let db_con = DbConnection::connect(&database_url)?;
    db_con.migrate().await?;
    let mm = ModelManager::new(db_con);
    let actor = AuthenticatedUser::admin();

    match args.command {
        Commands::User { action } => match action {
            UserCommands::Add { username, password, role } => {
                let user = UserEntity::create(
                    &mm,
                    &actor,
                    UserEntityCreate {
                        username,
                        password_hash: academy::auth::hash_password(&password)?,
                        role: UserRole::from(role.as_str()),
                    },
                )
                .await?;
                println!("User created: {} ({})", user.username(), user.role());
            }
        },

        Commands::Course { action } => match action {
            CourseCommands::Generate { owner, prompt, modules, lessons, tests } => {
                let owner = find_admin(&mm, &owner).await?;
                let Some(grant) = owner.admin_grant() else {
                    return Err(CliError::NotAdmin(owner.user_id().to_string()));
                };

                let generator = CourseGenerator::from_config(config.generation())?;
                let request = CourseRequest {
                    prompt,
                    num_content_modules: modules,
                    num_lessons_per_module: lessons,
                    num_test_modules: tests,
                };

                let (course, report) = generator.generate_course(&mm, &grant, &request).await?;
                println!(
                    "Course created: {} `{}` ({} modules, {} lessons, {} questions)",
                    course.id(),
                    course.title(),
                    report.modules,
                    report.lessons,
                    report.questions,
                );
                for item in &report.degraded {
                    println!("  degraded [{}] {}: {}", item.stage, item.item, item.reason);
                }
            }

            CourseCommands::Publish { id } => {
                let course = find_course(&mm, &actor, id).await?;
                let update = CourseCreate {
                    title: course.title().to_string(),
                    created_by: course.created_by(),
                    status: CourseStatus::Published,
                };
                let course = course.update(&mm, &actor, update).await?;
                println!("Course {} is now {}", course.id(), course.status());
            }

            CourseCommands::Show { id } => {
                let course = find_course(&mm, &actor, id).await?;
                let detail = CourseDetail::fetch(&mm, &actor, course).await?;
                match serde_json::to_string_pretty(&detail) {
                    Ok(json) => println!("{json}"),
                    Err(e) => eprintln!("unable to render course: {e}"),
                }
            }

            CourseCommands::List { limit, offset } => {
                let page = Course::page(&mm, &actor, limit, offset).await?;
                for course in &page.items {
                    println!("{}  [{}]  {}", course.id(), course.status(), course.title());
                }
                if page.has_more() {
                    println!("... {} courses in total", page.total);
                }
            }
        },
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let args = Cli::parse();

    if let Err(e) = run(args).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
