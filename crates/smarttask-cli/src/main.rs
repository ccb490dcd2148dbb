mod render;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime};
use clap::Parser;
use owo_colors::OwoColorize;
use smarttask_core::config::{SmartTaskConfig, API_URL_ENV};
use smarttask_core::error::{user_message, SmartTaskError, DEFAULT_ERROR_MESSAGE};
use smarttask_core::gateway::{AuthLayer, Gateway, HttpTransport};
use smarttask_core::model::*;
use smarttask_core::session::SessionStore;
use smarttask_core::storage::create_storage;
use smarttask_core::tasks::{recent_tasks, TaskOverview, TaskStore};

type Api = Gateway<AuthLayer<HttpTransport>>;

#[derive(Parser)]
#[command(name = "smarttask", about = "SmartTask: task management from the terminal", version)]
enum Cli {
    /// Log in and store the session locally
    Login {
        username: String,
        /// Password (prefer the environment variable over the flag)
        #[arg(long, env = "SMARTTASK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and log in with it
    Register {
        username: String,
        email: String,
        #[arg(long, env = "SMARTTASK_PASSWORD", hide_env_values = true)]
        password: String,
        /// Full name shown instead of the username
        #[arg(long)]
        full_name: Option<String>,
    },
    /// End the current session
    Logout,
    /// Show the logged-in user
    Whoami {
        #[arg(long)]
        json: bool,
    },
    /// Show API endpoint and session state
    Status,
    /// List tasks
    List {
        /// Only tasks with this status (todo, in-progress, completed, cancelled, all)
        #[arg(short, long, default_value = "all")]
        status: StatusFilter,
        /// Case-insensitive text matched against title, description, and tags
        #[arg(short = 'q', long)]
        search: Option<String>,
        /// Only overdue tasks
        #[arg(long)]
        overdue: bool,
        /// Output raw JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show a task's full details
    Get {
        id: i64,
        #[arg(long)]
        json: bool,
    },
    /// Create a task
    Create {
        title: String,
        #[arg(short, long)]
        description: Option<String>,
        /// low, medium, high, urgent
        #[arg(short, long)]
        priority: Option<TaskPriority>,
        /// Initial status (defaults to todo on the server)
        #[arg(long)]
        status: Option<TaskStatus>,
        /// Due date, e.g. 2024-03-05 or 2024-03-05T18:00
        #[arg(long)]
        due: Option<String>,
        /// Estimated effort in hours
        #[arg(long)]
        hours: Option<u32>,
        /// Tags (can be repeated)
        #[arg(short, long)]
        tag: Vec<String>,
        /// Make this a subtask of another task
        #[arg(long)]
        parent: Option<i64>,
        /// Let the server enrich the task with AI suggestions
        #[arg(long)]
        ai: bool,
        #[arg(long)]
        json: bool,
    },
    /// Change fields of an existing task
    Update {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long)]
        status: Option<TaskStatus>,
        #[arg(short, long)]
        priority: Option<TaskPriority>,
        #[arg(long)]
        due: Option<String>,
        #[arg(long)]
        hours: Option<u32>,
        /// Replace the tag list (can be repeated)
        #[arg(short, long)]
        tag: Option<Vec<String>>,
        #[arg(long)]
        json: bool,
    },
    /// Delete a task
    Delete { id: i64 },
    /// Ask the AI to analyze a task description
    Analyze {
        text: String,
        /// Extra context for the analysis
        #[arg(long)]
        context: Option<String>,
        /// Create a task from the text with the suggestions applied
        #[arg(long)]
        create: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Task counts, overdue tasks, and the most recent tasks
    Dashboard {
        #[arg(long)]
        json: bool,
    },
    /// Show WhatsApp notification preferences
    Notifications {
        #[arg(long)]
        json: bool,
    },
    /// Change WhatsApp notification preferences
    NotificationsSet {
        /// Number in international format, e.g. +5511999999999
        #[arg(long)]
        number: Option<String>,
        /// Daily reminder time (HH:mm)
        #[arg(long)]
        time: Option<String>,
        #[arg(long)]
        timezone: Option<String>,
        #[arg(long, conflicts_with = "disable")]
        enable: bool,
        #[arg(long)]
        disable: bool,
        #[arg(long)]
        overdue_alerts: Option<bool>,
        #[arg(long)]
        completion_summary: Option<bool>,
    },
    /// Send a test WhatsApp notification
    NotificationsTest,
    /// Show which integrations are configured
    Settings {
        #[arg(long)]
        json: bool,
    },
    /// Update integration credentials. Omitted or blank values keep their stored value.
    SettingsSet {
        #[arg(long)]
        openai_key: Option<String>,
        #[arg(long)]
        twilio_sid: Option<String>,
        #[arg(long)]
        twilio_token: Option<String>,
        #[arg(long)]
        twilio_number: Option<String>,
        #[arg(long)]
        user_number: Option<String>,
    },
    /// Print the effective configuration as TOML
    Config,
}

impl Cli {
    /// Commands that only make sense with a session.
    fn requires_login(&self) -> bool {
        !matches!(
            self,
            Cli::Login { .. }
                | Cli::Register { .. }
                | Cli::Logout
                | Cli::Whoami { .. }
                | Cli::Status
                | Cli::Config
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .compact()
        .init();

    let cli = Cli::parse();
    let config = SmartTaskConfig::load(Some(&std::env::current_dir()?))
        .unwrap_or_else(|_| SmartTaskConfig::default_config());

    let result = run(cli, &config).await;
    if let Err(ref err) = result {
        if let Some(friendly) = friendly_error(err, &config) {
            eprintln!("{} {}", "Error:".red(), friendly);
            std::process::exit(1);
        }
    }
    result
}

async fn run(cli: Cli, config: &SmartTaskConfig) -> Result<()> {
    let storage = create_storage(config).context("failed to open session storage")?;
    let session = Arc::new(SessionStore::restore(storage));
    let api = Gateway::from_config(&config.api, session.clone(), login_redirect)
        .context("failed to create HTTP client")?;

    if cli.requires_login() {
        require_login(&session)?;
    }

    match cli {
        Cli::Login { username, password } => {
            cmd_login(&api, &session, LoginRequest::new(username, password)).await
        }
        Cli::Register {
            username,
            email,
            password,
            full_name,
        } => {
            let request = RegisterRequest {
                username,
                email,
                password,
                full_name,
            };
            cmd_register(&api, &session, request).await
        }
        Cli::Logout => cmd_logout(&session),
        Cli::Whoami { json } => cmd_whoami(&session, json),
        Cli::Status => cmd_status(&session, config),
        Cli::List {
            status,
            search,
            overdue,
            json,
        } => cmd_list(&api, config, status, search, overdue, json).await,
        Cli::Get { id, json } => cmd_get(&api, config, id, json).await,
        Cli::Create {
            title,
            description,
            priority,
            status,
            due,
            hours,
            tag,
            parent,
            ai,
            json,
        } => {
            let mut request = TaskRequest::new(title).with_tags(tag);
            request.description = description;
            request.priority = priority;
            request.status = status;
            request.due_date = due.as_deref().map(parse_due).transpose()?;
            request.estimated_hours = hours;
            request.parent_task_id = parent;
            cmd_create(&api, config, request, ai, json).await
        }
        Cli::Update {
            id,
            title,
            description,
            status,
            priority,
            due,
            hours,
            tag,
            json,
        } => {
            let changes = TaskChanges {
                title,
                description,
                status,
                priority,
                due: due.as_deref().map(parse_due).transpose()?,
                hours,
                tags: tag,
            };
            cmd_update(&api, config, id, changes, json).await
        }
        Cli::Delete { id } => cmd_delete(&api, id).await,
        Cli::Analyze {
            text,
            context,
            create,
            json,
        } => cmd_analyze(&api, config, text, context, create, json).await,
        Cli::Dashboard { json } => cmd_dashboard(&api, config, json).await,
        Cli::Notifications { json } => cmd_notifications(&api, json).await,
        Cli::NotificationsSet {
            number,
            time,
            timezone,
            enable,
            disable,
            overdue_alerts,
            completion_summary,
        } => {
            let changes = PreferenceChanges {
                number,
                time,
                timezone,
                enabled: match (enable, disable) {
                    (true, _) => Some(true),
                    (_, true) => Some(false),
                    _ => None,
                },
                overdue_alerts,
                completion_summary,
            };
            cmd_notifications_set(&api, changes).await
        }
        Cli::NotificationsTest => cmd_notifications_test(&api).await,
        Cli::Settings { json } => cmd_settings(&api, json).await,
        Cli::SettingsSet {
            openai_key,
            twilio_sid,
            twilio_token,
            twilio_number,
            user_number,
        } => {
            let request = SettingsRequest {
                openai_api_key: openai_key,
                twilio_account_sid: twilio_sid,
                twilio_auth_token: twilio_token,
                twilio_whatsapp_number: twilio_number,
                user_whatsapp_number: user_number,
            };
            cmd_settings_set(&api, request).await
        }
        Cli::Config => cmd_config(config),
    }
}

// ---------------------------------------------------------------------------
// session plumbing
// ---------------------------------------------------------------------------

/// Invoked after a rejected token has already torn the session down.
fn login_redirect() {
    eprintln!(
        "{} Run {} to sign in.",
        "Not authenticated.".yellow(),
        "smarttask login <username>".cyan()
    );
}

/// Refuse protected commands when there is no session.
fn require_login(session: &SessionStore) -> Result<User> {
    match session.user() {
        Some(user) if session.is_authenticated() => Ok(user),
        _ => anyhow::bail!("not logged in. Run `smarttask login <username>` first"),
    }
}

/// Map a failure to the message a user should see, when there is a better
/// one than the raw error chain.
fn friendly_error(err: &anyhow::Error, config: &SmartTaskConfig) -> Option<String> {
    let api_err = err
        .chain()
        .find_map(|e| e.downcast_ref::<SmartTaskError>())?;
    match api_err {
        // The session is already gone; prefer the server's reason when it sent one.
        SmartTaskError::Unauthorized { .. } => Some(user_message(
            api_err,
            "session expired or credentials rejected",
        )),
        SmartTaskError::Http(e) if e.is_connect() || e.is_timeout() => Some(format!(
            "cannot reach the SmartTask API at {}. Is the server running? (override with {})",
            config.api.base_url,
            API_URL_ENV.cyan()
        )),
        SmartTaskError::Api { .. } | SmartTaskError::InvalidInput(_) => {
            Some(user_message(api_err, DEFAULT_ERROR_MESSAGE))
        }
        _ => None,
    }
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

fn parse_due(raw: &str) -> Result<NaiveDateTime> {
    timestamp::parse(raw).with_context(|| {
        format!("invalid due date '{raw}' (expected YYYY-MM-DD or YYYY-MM-DDTHH:MM)")
    })
}

// ---------------------------------------------------------------------------
// auth
// ---------------------------------------------------------------------------

async fn cmd_login(api: &Api, session: &SessionStore, request: LoginRequest) -> Result<()> {
    let auth = api.auth().login(&request).await.context("login failed")?;
    session.login(&auth);
    println!(
        "{} Logged in as {}",
        "✓".green(),
        auth.username.bold()
    );
    Ok(())
}

async fn cmd_register(api: &Api, session: &SessionStore, request: RegisterRequest) -> Result<()> {
    let auth = api
        .auth()
        .register(&request)
        .await
        .context("registration failed")?;
    session.login(&auth);
    println!(
        "{} Account created. Logged in as {}",
        "✓".green(),
        auth.username.bold()
    );
    Ok(())
}

fn cmd_logout(session: &SessionStore) -> Result<()> {
    if session.is_authenticated() {
        session.logout();
        println!("{} Logged out", "✓".green());
    } else {
        // Clears any partial durable entries as well.
        session.logout();
        println!("{}", "Not logged in.".dimmed());
    }
    Ok(())
}

fn cmd_whoami(session: &SessionStore, json: bool) -> Result<()> {
    let Some(user) = session.user() else {
        if json {
            println!("null");
        } else {
            println!("{}", "Not logged in.".dimmed());
        }
        return Ok(());
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&user)?);
    } else {
        render::print_user(&user);
    }
    Ok(())
}

fn cmd_status(session: &SessionStore, config: &SmartTaskConfig) -> Result<()> {
    println!("{}", "SmartTask".bold());
    println!("  {:<12} {}", "API:".dimmed(), config.api.base_url.cyan());
    match session.user() {
        Some(user) if session.is_authenticated() => {
            println!("  {:<12} {}", "Session:".dimmed(), "active".green());
            println!("  {:<12} {}", "User:".dimmed(), user.display_name());
        }
        _ => println!("  {:<12} {}", "Session:".dimmed(), "logged out".yellow()),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// tasks
// ---------------------------------------------------------------------------

async fn cmd_list(
    api: &Api,
    config: &SmartTaskConfig,
    status: StatusFilter,
    search: Option<String>,
    overdue: bool,
    json: bool,
) -> Result<()> {
    let tasks = if overdue {
        api.tasks().list_overdue().await
    } else {
        api.tasks().list().await
    }
    .context("failed to load tasks")?;

    let mut store = TaskStore::new();
    store.set_tasks(tasks);
    store.set_filter_status(status);
    store.set_search_query(search.unwrap_or_default());

    let visible = store.filtered_tasks();
    if json {
        println!("{}", serde_json::to_string_pretty(&visible)?);
        return Ok(());
    }

    render::print_task_list(&visible, &config.display, now());
    if store.is_filtered() && visible.len() < store.tasks().len() {
        println!(
            "{}",
            format!("({} hidden by filters)", store.tasks().len() - visible.len()).dimmed()
        );
    }
    Ok(())
}

async fn cmd_get(api: &Api, config: &SmartTaskConfig, id: i64, json: bool) -> Result<()> {
    let task = api
        .tasks()
        .get(id)
        .await
        .with_context(|| format!("failed to load task #{id}"))?;
    if json {
        println!("{}", serde_json::to_string_pretty(&task)?);
    } else {
        render::print_task_detail(&task, &config.display, now());
    }
    Ok(())
}

async fn cmd_create(
    api: &Api,
    config: &SmartTaskConfig,
    request: TaskRequest,
    ai: bool,
    json: bool,
) -> Result<()> {
    let task = if ai {
        api.tasks().create_with_ai(&request).await
    } else {
        api.tasks().create(&request).await
    }
    .context("failed to create task")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&task)?);
    } else {
        println!("{} Created task {}", "✓".green(), format!("#{}", task.id).cyan());
        println!("{}", render::task_line(&task, &config.display, now()));
    }
    Ok(())
}

/// Field overrides for `update`. `None` keeps the current value.
#[derive(Debug, Default)]
struct TaskChanges {
    title: Option<String>,
    description: Option<String>,
    status: Option<TaskStatus>,
    priority: Option<TaskPriority>,
    due: Option<NaiveDateTime>,
    hours: Option<u32>,
    tags: Option<Vec<String>>,
}

impl TaskChanges {
    fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.due.is_none()
            && self.hours.is_none()
            && self.tags.is_none()
    }

    fn apply(self, task: &Task) -> TaskRequest {
        let mut request = TaskRequest::from_task(task);
        if let Some(title) = self.title {
            request.title = title;
        }
        if let Some(description) = self.description {
            request.description = Some(description);
        }
        if let Some(status) = self.status {
            request.status = Some(status);
        }
        if let Some(priority) = self.priority {
            request.priority = Some(priority);
        }
        if let Some(due) = self.due {
            request.due_date = Some(due);
        }
        if let Some(hours) = self.hours {
            request.estimated_hours = Some(hours);
        }
        if let Some(tags) = self.tags {
            request.tags = None;
            request = request.with_tags(tags);
        }
        request
    }
}

async fn cmd_update(
    api: &Api,
    config: &SmartTaskConfig,
    id: i64,
    changes: TaskChanges,
    json: bool,
) -> Result<()> {
    if changes.is_empty() {
        anyhow::bail!("nothing to update. Pass at least one field, e.g. --status completed");
    }
    let current = api
        .tasks()
        .get(id)
        .await
        .with_context(|| format!("failed to load task #{id}"))?;

    let request = changes.apply(&current);
    let task = api
        .tasks()
        .update(id, &request)
        .await
        .with_context(|| format!("failed to update task #{id}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&task)?);
    } else {
        println!("{} Updated task {}", "✓".green(), format!("#{id}").cyan());
        println!("{}", render::task_line(&task, &config.display, now()));
    }
    Ok(())
}

async fn cmd_delete(api: &Api, id: i64) -> Result<()> {
    api.tasks()
        .delete(id)
        .await
        .with_context(|| format!("failed to delete task #{id}"))?;
    println!("{} Deleted task {}", "✓".green(), format!("#{id}").cyan());
    Ok(())
}

async fn cmd_analyze(
    api: &Api,
    config: &SmartTaskConfig,
    text: String,
    context: Option<String>,
    create: Option<String>,
    json: bool,
) -> Result<()> {
    let mut request = AiAnalysisRequest::new(text.clone());
    if let Some(context) = context {
        request = request.with_context(context);
    }
    let analysis = api
        .ai()
        .analyze(&request)
        .await
        .context("AI analysis failed")?;

    let Some(title) = create else {
        if json {
            println!("{}", serde_json::to_string_pretty(&analysis)?);
        } else {
            render::print_analysis(&analysis);
        }
        return Ok(());
    };

    let draft = analysis.apply_to(TaskRequest::new(title).with_description(text));
    let task = api
        .tasks()
        .create(&draft)
        .await
        .context("failed to create task")?;
    if json {
        println!("{}", serde_json::to_string_pretty(&task)?);
    } else {
        render::print_analysis(&analysis);
        println!();
        println!("{} Created task {}", "✓".green(), format!("#{}", task.id).cyan());
        println!("{}", render::task_line(&task, &config.display, now()));
    }
    Ok(())
}

async fn cmd_dashboard(api: &Api, config: &SmartTaskConfig, json: bool) -> Result<()> {
    let tasks = api.tasks().list().await.context("failed to load tasks")?;
    let now = now();
    let overview = TaskOverview::from_tasks(&tasks, now);
    let recent = recent_tasks(&tasks, config.display.recent_limit);
    let overdue: Vec<&Task> = tasks.iter().filter(|t| t.is_overdue_at(now)).collect();

    if json {
        let out = serde_json::json!({
            "overview": overview,
            "overdue": overdue,
            "recent": recent,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    render::print_overview(&overview);
    if !overdue.is_empty() {
        println!();
        println!("{}", "--- Overdue ---".red());
        for task in &overdue {
            println!("{}", render::task_line(task, &config.display, now));
        }
    }
    println!();
    println!("{}", "--- Recent ---".dimmed());
    render::print_task_list(&recent, &config.display, now);
    Ok(())
}

// ---------------------------------------------------------------------------
// notifications & settings
// ---------------------------------------------------------------------------

async fn current_preferences(api: &Api) -> Result<NotificationPreferenceRequest> {
    let stored = api
        .notifications()
        .preferences()
        .await
        .context("failed to load notification preferences")?;
    Ok(stored
        .map(|p| p.to_request())
        .unwrap_or_default())
}

async fn cmd_notifications(api: &Api, json: bool) -> Result<()> {
    let prefs = current_preferences(api).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&prefs)?);
    } else {
        render::print_preferences(&prefs);
    }
    Ok(())
}

#[derive(Debug, Default)]
struct PreferenceChanges {
    number: Option<String>,
    time: Option<String>,
    timezone: Option<String>,
    enabled: Option<bool>,
    overdue_alerts: Option<bool>,
    completion_summary: Option<bool>,
}

impl PreferenceChanges {
    fn apply(self, mut prefs: NotificationPreferenceRequest) -> NotificationPreferenceRequest {
        if let Some(number) = self.number {
            prefs.whatsapp_number = number.trim().to_string();
        }
        if let Some(time) = self.time {
            prefs.daily_reminder_time = time.trim().to_string();
        }
        if let Some(timezone) = self.timezone {
            prefs.timezone = timezone.trim().to_string();
        }
        if let Some(enabled) = self.enabled {
            prefs.enabled = enabled;
        }
        if let Some(flag) = self.overdue_alerts {
            prefs.send_overdue_alerts = flag;
        }
        if let Some(flag) = self.completion_summary {
            prefs.send_completion_summary = flag;
        }
        prefs
    }
}

async fn cmd_notifications_set(api: &Api, changes: PreferenceChanges) -> Result<()> {
    let prefs = changes.apply(current_preferences(api).await?);
    let saved = api
        .notifications()
        .save_preferences(&prefs)
        .await
        .context("failed to save notification preferences")?;
    println!("{} Notification preferences saved", "✓".green());
    render::print_preferences(&saved.to_request());
    Ok(())
}

async fn cmd_notifications_test(api: &Api) -> Result<()> {
    let configured = api
        .notifications()
        .preferences()
        .await
        .context("failed to load notification preferences")?
        .is_some_and(|p| p.has_whatsapp_number());
    if !configured {
        anyhow::bail!(
            "no WhatsApp number configured. Run `smarttask notifications-set --number <number>` first"
        );
    }
    let ack = api
        .notifications()
        .send_test()
        .await
        .context("failed to send test notification")?;
    let message = if ack.message.is_empty() {
        "Test notification sent"
    } else {
        ack.message.as_str()
    };
    println!("{} {}", "✓".green(), message);
    Ok(())
}

async fn cmd_settings(api: &Api, json: bool) -> Result<()> {
    let settings = api.settings().get().await.context("failed to load settings")?;
    if json {
        println!("{}", serde_json::to_string_pretty(&settings)?);
    } else {
        render::print_settings(&settings);
    }
    Ok(())
}

async fn cmd_settings_set(api: &Api, request: SettingsRequest) -> Result<()> {
    let settings = api
        .settings()
        .update(request)
        .await
        .context("failed to update settings")?;
    println!("{} Settings updated", "✓".green());
    render::print_settings(&settings);
    Ok(())
}

fn cmd_config(config: &SmartTaskConfig) -> Result<()> {
    print!("{}", config.to_toml()?);
    let project = Path::new(".smarttask").join("config.toml");
    if project.exists() {
        eprintln!("{}", format!("# project layer: {}", project.display()).dimmed());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use smarttask_core::config::ApiConfig;
    use smarttask_core::storage::MemoryStorage;
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn auth_response() -> AuthResponse {
        AuthResponse {
            token: "jwt-abc".into(),
            token_type: "Bearer".into(),
            id: 1,
            username: "ana".into(),
            email: "ana@example.com".into(),
            roles: vec!["USER".into()],
        }
    }

    fn test_session() -> Arc<SessionStore> {
        Arc::new(SessionStore::new(Arc::new(MemoryStorage::new())))
    }

    fn test_api(server: &MockServer, session: Arc<SessionStore>) -> Api {
        let config = ApiConfig {
            base_url: server.uri(),
            max_retries: 0,
            ..Default::default()
        };
        Gateway::from_config(&config, session, || {}).unwrap()
    }

    fn task_json(id: i64, title: &str, status: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "title": title,
            "status": status,
            "priority": "MEDIUM",
            "createdAt": "2024-03-01T09:00:00",
            "updatedAt": "2024-03-01T09:00:00"
        })
    }

    // -----------------------------------------------------------------------
    // argument parsing
    // -----------------------------------------------------------------------

    #[test]
    fn test_parse_list_filters() {
        let cli = Cli::try_parse_from(["smarttask", "list", "--status", "in-progress", "-q", "bug"])
            .unwrap();
        match cli {
            Cli::List { status, search, .. } => {
                assert_eq!(status, StatusFilter::Only(TaskStatus::InProgress));
                assert_eq!(search.as_deref(), Some("bug"));
            }
            _ => panic!("expected list"),
        }
    }

    #[test]
    fn test_parse_rejects_unknown_priority() {
        assert!(Cli::try_parse_from(["smarttask", "create", "Title", "-p", "whenever"]).is_err());
    }

    #[test]
    fn test_route_guard() {
        let list = Cli::try_parse_from(["smarttask", "list"]).unwrap();
        assert!(list.requires_login());
        let status = Cli::try_parse_from(["smarttask", "status"]).unwrap();
        assert!(!status.requires_login());

        let session = test_session();
        assert!(require_login(&session).is_err());
        session.login(&auth_response());
        assert_eq!(require_login(&session).unwrap().username, "ana");
    }

    // -----------------------------------------------------------------------
    // helpers
    // -----------------------------------------------------------------------

    #[test]
    fn test_parse_due() {
        assert!(parse_due("2024-03-05").is_ok());
        assert!(parse_due("2024-03-05T18:00").is_ok());
        assert!(parse_due("next tuesday").is_err());
    }

    #[test]
    fn test_task_changes_apply() {
        let task: Task = serde_json::from_value(serde_json::json!({
            "id": 3,
            "title": "Old title",
            "status": "TODO",
            "priority": "LOW",
            "tags": ["a", "b"],
            "createdAt": "2024-03-01T09:00:00",
            "updatedAt": "2024-03-01T09:00:00"
        }))
        .unwrap();
        let changes = TaskChanges {
            status: Some(TaskStatus::Completed),
            tags: Some(vec!["c".into(), "c".into()]),
            ..Default::default()
        };
        assert!(!changes.is_empty());
        let request = changes.apply(&task);
        assert_eq!(request.title, "Old title");
        assert_eq!(request.status, Some(TaskStatus::Completed));
        assert_eq!(request.priority, Some(TaskPriority::Low));
        assert_eq!(request.tags, Some(vec!["c".to_string()]));
    }

    #[test]
    fn test_preference_changes_apply() {
        let changes = PreferenceChanges {
            number: Some(" +5511999998888 ".into()),
            enabled: Some(true),
            ..Default::default()
        };
        let prefs = changes.apply(NotificationPreferenceRequest::default());
        assert_eq!(prefs.whatsapp_number, "+5511999998888");
        assert!(prefs.enabled);
        assert_eq!(prefs.daily_reminder_time, "08:30");
    }

    #[test]
    fn test_friendly_error_uses_backend_message() {
        let config = SmartTaskConfig::default_config();
        let err = anyhow::Error::new(SmartTaskError::Api {
            status: 400,
            body: r#"{"erros":{"title":"Título é obrigatório"}}"#.into(),
        })
        .context("failed to create task");
        assert_eq!(
            friendly_error(&err, &config).as_deref(),
            Some("Título é obrigatório")
        );

        let plain = anyhow::anyhow!("something else");
        assert!(friendly_error(&plain, &config).is_none());
    }

    // -----------------------------------------------------------------------
    // commands against a mock backend
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_cmd_login_stores_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(auth_response()))
            .mount(&server)
            .await;

        let session = test_session();
        let api = test_api(&server, session.clone());
        cmd_login(&api, &session, LoginRequest::new("ana", "secret1"))
            .await
            .unwrap();
        assert!(session.is_authenticated());
        assert_eq!(session.token().as_deref(), Some("jwt-abc"));
    }

    #[tokio::test]
    async fn test_cmd_list_with_filters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tasks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                task_json(1, "Fix login bug", "TODO"),
                task_json(2, "Write docs", "COMPLETED"),
            ])))
            .mount(&server)
            .await;

        let session = test_session();
        session.login(&auth_response());
        let api = test_api(&server, session);
        let config = SmartTaskConfig::default_config();
        let result = cmd_list(
            &api,
            &config,
            StatusFilter::Only(TaskStatus::Todo),
            Some("LOGIN".into()),
            false,
            true,
        )
        .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_cmd_dashboard() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tasks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                task_json(1, "Fix login bug", "IN_PROGRESS"),
            ])))
            .mount(&server)
            .await;

        let session = test_session();
        session.login(&auth_response());
        let api = test_api(&server, session);
        let config = SmartTaskConfig::default_config();
        assert!(cmd_dashboard(&api, &config, false).await.is_ok());
    }

    #[tokio::test]
    async fn test_cmd_update_requires_changes() {
        let server = MockServer::start().await;
        let session = test_session();
        let api = test_api(&server, session);
        let config = SmartTaskConfig::default_config();
        let err = cmd_update(&api, &config, 1, TaskChanges::default(), false)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("nothing to update"));
    }

    #[tokio::test]
    async fn test_cmd_notifications_test_requires_number() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/notifications/preferences"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/notifications/test"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let session = test_session();
        session.login(&auth_response());
        let api = test_api(&server, session);
        let err = cmd_notifications_test(&api).await.unwrap_err();
        assert!(err.to_string().contains("no WhatsApp number"));
    }

    #[tokio::test]
    async fn test_unauthorized_logs_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/settings"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let session = test_session();
        session.login(&auth_response());
        let api = test_api(&server, session.clone());
        let err = cmd_settings(&api, false).await.unwrap_err();
        assert!(!session.is_authenticated());

        let config = SmartTaskConfig::default_config();
        assert_eq!(
            friendly_error(&err, &config).as_deref(),
            Some("session expired or credentials rejected")
        );
    }

    #[tokio::test]
    async fn test_rejected_login_shows_server_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(serde_json::json!({"message": "Usuário ou senha inválidos."})),
            )
            .mount(&server)
            .await;

        let session = test_session();
        let api = test_api(&server, session.clone());
        let err = cmd_login(&api, &session, LoginRequest::new("ana", "wrongpass"))
            .await
            .unwrap_err();
        assert!(!session.is_authenticated());

        let config = SmartTaskConfig::default_config();
        assert_eq!(
            friendly_error(&err, &config).as_deref(),
            Some("Usuário ou senha inválidos.")
        );
    }
}
