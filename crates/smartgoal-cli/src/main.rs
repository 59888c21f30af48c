//! smartgoal CLI
//!
//! Command-line front end for the smartgoal assignment feedback backend.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use smartgoal_client::{load_session, ApiClient, AssignmentView, RosterView};
use smartgoal_core::{
    friendly_date, initials, resolve_attempt_status, split_latest_feedback, string_to_color,
    AssignmentCreate, AssignmentPublic, AttemptCreate, Config, CoursePublic, EvalMetrics,
    FeedbackCreate, FeedbackData, FilePublic, GroupFilter, OutputFormat, RosterQuery, Session,
    SmartData, SortDirection, SortKey,
};
use smartgoal_report::{json::JsonGenerator, AssignmentOverview, MarkdownGenerator, RosterReport};
use tracing_subscriber::EnvFilter;

/// smartgoal - SMART goal assignment feedback
///
/// Submit SMART goals and action plans, review feedback, and manage course
/// rosters against a smartgoal backend.
#[derive(Parser, Debug)]
#[command(name = "smartgoal")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (default: smartgoal.json in current directory)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<String>,

    /// Backend origin, overriding the config file and environment
    #[arg(long, value_name = "URL", global = true)]
    base_url: Option<String>,

    /// Session cookie header value, overriding the config file and environment
    #[arg(long, value_name = "VALUE", global = true)]
    cookie: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the logged-in user
    Whoami,

    /// List your courses
    Courses,

    /// List the assignments of a course
    Assignments {
        course_id: String,
    },

    /// Create an assignment (teachers only)
    CreateAssignment {
        course_id: String,

        /// Assignment name
        #[arg(long)]
        name: String,

        /// Markdown description
        #[arg(long, default_value = "")]
        about: String,

        /// Feedback on this assignment carries a numeric score
        #[arg(long)]
        scorable: bool,
    },

    /// Show assignment status and submission history
    Status {
        course_id: String,
        assignment_id: String,

        /// Review a student's attempts instead of your own (teachers only)
        #[arg(long, value_name = "USER_ID")]
        student: Option<String>,

        /// Output format: md or json
        #[arg(long, value_parser = parse_format)]
        format: Option<OutputFormat>,
    },

    /// Show the assignment roster (teachers only)
    Roster {
        course_id: String,
        assignment_id: String,

        /// Group number parity to show
        #[arg(long, value_enum, default_value_t = GroupArg::All)]
        group: GroupArg,

        /// Only show students awaiting review
        #[arg(long)]
        needs_review: bool,

        /// Column to sort by
        #[arg(long, value_enum, default_value_t = SortArg::Name)]
        sort: SortArg,

        /// Sort descending
        #[arg(long)]
        desc: bool,

        /// Page number, starting at 1
        #[arg(long, default_value_t = 1)]
        page: usize,

        /// Output format: md or json
        #[arg(long, value_parser = parse_format)]
        format: Option<OutputFormat>,
    },

    /// Submit a SMART goal and action plan
    Submit {
        course_id: String,
        assignment_id: String,

        /// The SMART goal
        #[arg(long)]
        goal: String,

        /// The action plan
        #[arg(long)]
        plan: String,

        /// File to attach (repeatable)
        #[arg(long = "file", value_name = "PATH")]
        files: Vec<PathBuf>,
    },

    /// Show one attempt with its files and feedback
    Attempt {
        course_id: String,
        attempt_id: String,
    },

    /// Leave feedback on an attempt
    Feedback {
        attempt_id: String,

        /// Feedback text
        #[arg(long)]
        text: String,

        /// Approve the attempt
        #[arg(long, conflicts_with = "resubmit", required_unless_present = "resubmit")]
        approve: bool,

        /// Ask for a resubmission
        #[arg(long)]
        resubmit: bool,

        /// Additional comments
        #[arg(long)]
        comments: Option<String>,

        /// Score, for scorable assignments
        #[arg(long)]
        score: Option<i64>,

        /// Star rating of the AI feedback (1-5)
        #[arg(long)]
        rating: Option<u8>,

        /// Problem tag for the AI feedback (repeatable)
        #[arg(long = "problem", value_name = "TAG")]
        problems: Vec<String>,
    },

    /// Look up an invite key and show how to accept it
    Enroll {
        invite_key: String,
    },

    /// Set a course member's group number; omit it to unassign
    Group {
        course_id: String,
        user_id: String,
        group_num: Option<i64>,
    },

    /// Show the logout URL and forget the session
    Logout,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum GroupArg {
    All,
    Even,
    Odd,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum SortArg {
    Name,
    Email,
    Group,
    Role,
    Submissions,
    Status,
    LastAttempt,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if args.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(config = ?args.config, command = ?args.command, "smartgoal starting");

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}

/// Dispatches the parsed command.
async fn run(args: Args) -> anyhow::Result<()> {
    let config = load_config(&args)?;
    let client = ApiClient::new(&config)?;
    let format = config.default_format;

    match args.command {
        Command::Whoami => whoami(&client).await,
        Command::Courses => courses(&client).await,
        Command::Assignments { course_id } => assignments(&client, &course_id).await,
        Command::CreateAssignment {
            course_id,
            name,
            about,
            scorable,
        } => {
            let draft = AssignmentCreate {
                name,
                about,
                scorable,
            };
            create_assignment(&client, &course_id, &draft).await
        }
        Command::Status {
            course_id,
            assignment_id,
            student,
            format: chosen,
        } => {
            status(
                &client,
                &course_id,
                &assignment_id,
                student.as_deref(),
                chosen.unwrap_or(format),
            )
            .await
        }
        Command::Roster {
            course_id,
            assignment_id,
            group,
            needs_review,
            sort,
            desc,
            page,
            format: chosen,
        } => {
            let query = RosterQuery {
                group: convert_group(group),
                needs_review,
                sort_key: convert_sort(sort),
                direction: if desc {
                    SortDirection::Desc
                } else {
                    SortDirection::Asc
                },
                page: page.saturating_sub(1),
                per_page: config.roster_page_size,
            };
            roster(&client, &course_id, &assignment_id, query, chosen.unwrap_or(format)).await
        }
        Command::Submit {
            course_id,
            assignment_id,
            goal,
            plan,
            files,
        } => {
            submit(
                &client,
                &course_id,
                &assignment_id,
                SmartData::new(goal, plan),
                &files,
            )
            .await
        }
        Command::Attempt {
            course_id,
            attempt_id,
        } => attempt(&client, &course_id, &attempt_id).await,
        Command::Feedback {
            attempt_id,
            text,
            approve,
            resubmit: _,
            comments,
            score,
            rating,
            problems,
        } => {
            let eval = EvalMetrics {
                rating,
                problems: problems.into_iter().collect(),
            };
            let data = FeedbackData {
                other_comments: comments,
                score,
                eval: (!eval.is_empty()).then_some(eval),
                ..FeedbackData::new(text, approve)
            };
            feedback(&client, attempt_id, data).await
        }
        Command::Enroll { invite_key } => enroll(&client, &invite_key).await,
        Command::Group {
            course_id,
            user_id,
            group_num,
        } => group(&client, &course_id, &user_id, group_num).await,
        Command::Logout => logout(&client).await,
    }
}

// ============================================================================
// Commands
// ============================================================================

async fn whoami(client: &ApiClient) -> anyhow::Result<()> {
    let mut session = Session::anonymous();
    let response = load_session(client, &mut session).await;
    if let Some(message) = response.error_message() {
        anyhow::bail!(
            "Not logged in: {message}\n\n\
             Suggestion: Log in at {} and pass the session cookie with --cookie",
            client.login_url(None)
        );
    }

    let user = session.require_user()?;
    println!("Logged in as {} <{}>", user.name, user.email);
    println!("  Initials: {}", initials(&user.name));
    println!("  Avatar colour: {}", string_to_color(&user.email));
    Ok(())
}

async fn courses(client: &ApiClient) -> anyhow::Result<()> {
    let courses = client.list_courses().await.into_result()?;
    if courses.is_empty() {
        println!("You are not enrolled in any course.");
        return Ok(());
    }

    for course in &courses {
        let role = course
            .your_role
            .map_or_else(|| "-".to_string(), |r| r.to_string());
        println!("{}  {} ({role})", course.id, course.name);
    }
    Ok(())
}

async fn assignments(client: &ApiClient, course_id: &str) -> anyhow::Result<()> {
    let course = client.get_course(course_id).await.into_result()?;
    let assignments = client.list_assignments(course_id).await.into_result()?;

    println!("{}", course.name);
    if assignments.is_empty() {
        println!("  No assignments yet.");
        return Ok(());
    }
    for assignment in &assignments {
        let scorable = if assignment.scorable { " [scored]" } else { "" };
        println!("  {}  {}{scorable}", assignment.id, assignment.name);
    }
    Ok(())
}

async fn create_assignment(
    client: &ApiClient,
    course_id: &str,
    draft: &AssignmentCreate,
) -> anyhow::Result<()> {
    if draft.name.trim().is_empty() {
        anyhow::bail!("Assignment name must not be empty");
    }
    let course = client.get_course(course_id).await.into_result()?;
    if !course.viewer_is_teacher() {
        anyhow::bail!("Only teachers of '{}' can create assignments", course.name);
    }

    let created = client
        .create_assignment(course_id, draft)
        .await
        .into_result()?;
    tracing::info!(assignment_id = %created.id, "Assignment created");
    println!("Created assignment {} ({})", created.name, created.id);
    Ok(())
}

async fn status(
    client: &ApiClient,
    course_id: &str,
    assignment_id: &str,
    student: Option<&str>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let (course, assignment) = load_course_assignment(client, course_id, assignment_id).await?;
    let viewer_is_teacher = course.viewer_is_teacher();

    let mut view = AssignmentView::new(assignment_id, viewer_is_teacher);
    if let Some(student_id) = student {
        if !viewer_is_teacher {
            anyhow::bail!("Only teachers can review another student's attempts");
        }
        view = view.for_student(student_id);
    }

    view.refresh(client).await;
    if let Some(message) = view.error() {
        anyhow::bail!("Failed to load attempts: {message}");
    }

    let overview = AssignmentOverview::build(&course, &assignment, view.attempts(), student);
    match format {
        OutputFormat::Markdown => print!("{}", MarkdownGenerator::overview(&overview)),
        OutputFormat::Json => println!("{}", JsonGenerator::new(&overview).generate_pretty()?),
    }
    Ok(())
}

async fn roster(
    client: &ApiClient,
    course_id: &str,
    assignment_id: &str,
    query: RosterQuery,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let (course, assignment) = load_course_assignment(client, course_id, assignment_id).await?;
    if !course.viewer_is_teacher() {
        anyhow::bail!("The roster is only available to teachers of '{}'", course.name);
    }

    let mut view = RosterView::new(course_id, assignment_id, query);
    view.refresh(client).await;
    if let Some(message) = view.error() {
        anyhow::bail!("Failed to load roster: {message}");
    }

    let report = RosterReport::build(&course, &assignment, &view.query, &view.page());
    match format {
        OutputFormat::Markdown => print!("{}", MarkdownGenerator::roster(&report)),
        OutputFormat::Json => println!("{}", JsonGenerator::new(&report).generate_pretty()?),
    }
    Ok(())
}

async fn submit(
    client: &ApiClient,
    course_id: &str,
    assignment_id: &str,
    data: SmartData,
    files: &[PathBuf],
) -> anyhow::Result<()> {
    data.validate()?;

    let course = client.get_course(course_id).await.into_result()?;
    let mut view = AssignmentView::new(assignment_id, course.viewer_is_teacher());
    view.refresh(client).await;
    if let Some(message) = view.error() {
        anyhow::bail!("Failed to load attempts: {message}");
    }

    let summary = view.summary();
    if !summary.can_resubmit {
        anyhow::bail!(
            "A new submission is not allowed while the assignment is {}",
            summary.status
        );
    }

    let mut file_ids = Vec::with_capacity(files.len());
    for path in files {
        let file = upload(client, path).await?;
        println!("Uploaded {} ({})", file.filename, file.id);
        file_ids.push(file.id);
    }

    let attempt = client
        .create_attempt(&AttemptCreate {
            assignment_id: assignment_id.to_string(),
            data,
            file_ids,
        })
        .await
        .into_result()?;
    tracing::info!(attempt_id = %attempt.id, "Attempt submitted");

    view.refresh(client).await;
    println!("Submitted attempt {}", attempt.id);
    match refreshed_status(&view) {
        Ok(line) => println!("{line}"),
        Err(warning) => {
            tracing::warn!(attempt_id = %attempt.id, "Status refresh after submit failed");
            eprintln!("{warning}");
        }
    }
    Ok(())
}

/// Status line after a submission, or a warning when the re-fetch failed.
fn refreshed_status(view: &AssignmentView) -> Result<String, String> {
    match view.error() {
        Some(message) => Err(format!("Warning: could not refresh status: {message}")),
        None => Ok(format!("Status: {}", view.summary().status)),
    }
}

async fn attempt(client: &ApiClient, course_id: &str, attempt_id: &str) -> anyhow::Result<()> {
    let course = client.get_course(course_id).await.into_result()?;
    let attempt = client.get_attempt(attempt_id).await.into_result()?;
    let status = resolve_attempt_status(&attempt, course.viewer_is_teacher());

    println!("Attempt {} ({})", attempt.id, friendly_date(&attempt.created_at));
    println!("Status: {status}");
    println!("Goal: {}", attempt.data.goal);
    println!("Plan: {}", attempt.data.plan);
    for file in &attempt.files {
        println!("File: {} <{}>", file.filename, file.read_url);
    }

    let latest = split_latest_feedback(&attempt);
    for (label, feedback) in [("AI feedback", latest.ai), ("Teacher feedback", latest.human)] {
        if let Some(feedback) = feedback {
            let verdict = if feedback.data.approved {
                "approved"
            } else {
                "needs work"
            };
            println!("{label} ({verdict}): {}", feedback.data.feedback);
        }
    }
    Ok(())
}

async fn feedback(
    client: &ApiClient,
    attempt_id: String,
    data: FeedbackData,
) -> anyhow::Result<()> {
    let approved = data.approved;
    let created = client
        .create_feedback(&FeedbackCreate { attempt_id, data })
        .await
        .into_result()?;

    let verdict = if approved {
        "approved"
    } else {
        "resubmission requested"
    };
    println!("Feedback {} saved ({verdict})", created.id);
    Ok(())
}

async fn enroll(client: &ApiClient, invite_key: &str) -> anyhow::Result<()> {
    let invite = client.lookup_invite(invite_key).await.into_result()?;

    println!("Course: {}", invite.course.name);
    println!("Role on acceptance: {}", invite.invite_role);
    if invite.already_enrolled {
        println!("You are already enrolled in this course.");
    } else {
        println!("Accept the invite by logging in at:");
        println!("  {}", client.login_url(Some(invite_key)));
    }
    Ok(())
}

async fn group(
    client: &ApiClient,
    course_id: &str,
    user_id: &str,
    group_num: Option<i64>,
) -> anyhow::Result<()> {
    let course = client.get_course(course_id).await.into_result()?;
    if !course.viewer_is_teacher() {
        anyhow::bail!("Only teachers of '{}' can change group numbers", course.name);
    }

    let update = client
        .update_group(course_id, user_id, group_num)
        .await
        .into_result()?;
    match update.group_num {
        Some(num) => println!("{user_id} is now in group {num}"),
        None => println!("{user_id} no longer has a group"),
    }
    Ok(())
}

async fn logout(client: &ApiClient) -> anyhow::Result<()> {
    let mut session = Session::anonymous();
    load_session(client, &mut session).await;
    match session.user() {
        Some(user) => println!("Logging out {} <{}>", user.name, user.email),
        None => println!("No active session."),
    }
    session.clear();

    println!("Log out in your browser at:");
    println!("  {}", client.logout_url());
    println!("Then remove the session cookie from your config or environment.");
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

/// Loads configuration and applies environment and CLI overrides.
fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = match args.config.as_deref() {
        Some(path_str) => {
            let path = Path::new(path_str);
            if !path.exists() {
                anyhow::bail!(
                    "Config file not found: '{}'\n\n\
                     Suggestion: Check the path or remove the --config flag to use defaults",
                    path.display()
                );
            }
            Config::load_from_file(path)?
        }
        None => Config::load()?,
    };

    config.apply_env_overrides();
    if let Some(base_url) = &args.base_url {
        config.base_url.clone_from(base_url);
    }
    if let Some(cookie) = &args.cookie {
        config.session_cookie = Some(cookie.clone());
    }

    // Re-validate after overrides
    config.validate()?;
    tracing::debug!(api_root = %config.api_root(), "Configuration loaded");
    Ok(config)
}

async fn load_course_assignment(
    client: &ApiClient,
    course_id: &str,
    assignment_id: &str,
) -> anyhow::Result<(CoursePublic, AssignmentPublic)> {
    let course = client.get_course(course_id).await.into_result()?;
    let assignment = client
        .list_assignments(course_id)
        .await
        .into_result()?
        .into_iter()
        .find(|a| a.id == assignment_id)
        .ok_or_else(|| {
            anyhow::anyhow!(
                "Assignment '{assignment_id}' not found in '{}'\n\n\
                 Suggestion: Run `smartgoal assignments {course_id}` to list them",
                course.name
            )
        })?;
    Ok((course, assignment))
}

async fn upload(client: &ApiClient, path: &Path) -> anyhow::Result<FilePublic> {
    client
        .upload_path(path)
        .await
        .into_result()
        .map_err(|e| anyhow::anyhow!("Failed to upload '{}': {e}", path.display()))
}

fn parse_format(s: &str) -> Result<OutputFormat, String> {
    OutputFormat::from_str_case_insensitive(s)
        .ok_or_else(|| format!("unknown format '{s}' (expected md or json)"))
}

/// Converts `GroupArg` to `GroupFilter`.
const fn convert_group(group: GroupArg) -> GroupFilter {
    match group {
        GroupArg::All => GroupFilter::All,
        GroupArg::Even => GroupFilter::Even,
        GroupArg::Odd => GroupFilter::Odd,
    }
}

/// Converts `SortArg` to `SortKey`.
const fn convert_sort(sort: SortArg) -> SortKey {
    match sort {
        SortArg::Name => SortKey::Name,
        SortArg::Email => SortKey::Email,
        SortArg::Group => SortKey::Group,
        SortArg::Role => SortKey::Role,
        SortArg::Submissions => SortKey::Submissions,
        SortArg::Status => SortKey::Status,
        SortArg::LastAttempt => SortKey::LastAttemptDate,
    }
}
