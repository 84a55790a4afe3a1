use anyhow::{Context as _, Result};

use todosheets::backend::google::GoogleBackend;
use todosheets::config::Config;
use todosheets::identity::{CommandIdentity, IdentityProvider, Unavailable};
use todosheets::store::FileStore;
use todosheets::weather::WeatherClient;
use todosheets::{ListSynchronizer, ReauthPolicy, SessionState, SheetRef, SignedIn, TaskRecord, TodoClient};

const SELECT_HINT: &str = "Run `todosheets sheets` and then `todosheets select <id>`";

/// Per-invocation state: loaded in `open`, saved in `close`
pub struct Context {
    config: Config,
    client: TodoClient<GoogleBackend, FileStore>,
}

impl Context {
    pub fn open(config: Config, token: Option<String>) -> Result<Self> {
        let identity: Box<dyn IdentityProvider> = match CommandIdentity::from_argv(&config.token_command) {
            Some(command) => Box::new(command),
            None => Box::new(Unavailable),
        };

        let store = FileStore::new(config.state_path());
        let state_path = store.path().to_path_buf();

        // Create backend and synchronizer
        let backend = GoogleBackend::new(&config).context("Failed to create HTTP client")?;
        let sync = ListSynchronizer::new(backend, config.sheet_name.clone());
        let policy = ReauthPolicy::new(config.reauth_attempts, config.reauth_delay());

        let mut client = TodoClient::open(sync, identity, store, policy)
            .with_context(|| format!("Failed to read state from {}", state_path.display()))?;

        // A token from the command line or environment replaces any cached one
        if let Some(token) = token {
            client.use_token(token);
        }

        Ok(Self { config, client })
    }

    pub fn close(self) -> Result<()> {
        self.client
            .save()
            .with_context(|| format!("Failed to save state to {}", self.client.store().path().display()))
    }
}

/// Attach the user-facing prefix, plus a hint when no sheet is selected
fn describe<T>(result: todosheets::Result<T>, action: &'static str) -> Result<T> {
    match result {
        Err(todosheets::SyncError::NoSheetSelected) => {
            anyhow::bail!("{}: no sheet selected. {}", action, SELECT_HINT)
        }
        other => other.context(action),
    }
}

fn print_sheets(sheets: &[SheetRef]) {
    if sheets.is_empty() {
        println!("No spreadsheets found");
    } else {
        println!("Spreadsheets ({}):\n", sheets.len());
        for sheet in sheets {
            println!("  {} - {}", sheet.id, sheet.name);
        }
    }
    println!("\nSelect one with `todosheets select <id>` or run `todosheets create`");
}

fn print_todos(tasks: &[TaskRecord]) {
    if tasks.is_empty() {
        println!("No todos yet. Add your first one with `todosheets add <text>`");
        return;
    }

    println!("Todos ({}):\n", tasks.len());
    for task in tasks {
        println!("  [#{}] {} ({})", task.id, task.text, task.created_date);
    }
}

fn non_empty(text: &str) -> Result<&str> {
    let text = text.trim();
    if text.is_empty() {
        anyhow::bail!("Task text must not be empty");
    }
    Ok(text)
}

/// Execute the login command
pub async fn login(ctx: &mut Context) -> Result<()> {
    let signed_in = describe(ctx.client.login().await, "Failed to sign in with Google")?;

    println!("Signed in\n");
    match signed_in {
        SignedIn::Tasks(tasks) => print_todos(&tasks),
        SignedIn::Sheets(sheets) => print_sheets(&sheets),
    }
    Ok(())
}

/// Execute the sheets command
pub async fn sheets(ctx: &mut Context) -> Result<()> {
    print_sheets(&describe(ctx.client.sheets().await, "Failed to fetch Google Sheets")?);
    Ok(())
}

/// Execute the select command
pub async fn select(ctx: &mut Context, id: &str) -> Result<()> {
    print_todos(&describe(ctx.client.select(id).await, "Failed to fetch todos")?);
    Ok(())
}

/// Execute the create command
pub async fn create(ctx: &mut Context, title: Option<&str>) -> Result<()> {
    let title = title.unwrap_or(&ctx.config.new_sheet_title).to_string();
    let (id, tasks) = describe(ctx.client.create(&title).await, "Failed to create new Google Sheet")?;

    println!("Created \"{}\" ({})\n", title, id);
    print_todos(&tasks);
    Ok(())
}

/// Execute the change-sheet command
pub async fn change_sheet(ctx: &mut Context) -> Result<()> {
    print_sheets(&describe(ctx.client.change_sheet().await, "Failed to fetch Google Sheets")?);
    Ok(())
}

/// Execute the list command
pub async fn list(ctx: &mut Context) -> Result<()> {
    print_todos(&describe(ctx.client.list().await, "Failed to fetch todos")?);
    Ok(())
}

/// Execute the add command
pub async fn add(ctx: &mut Context, text: &str) -> Result<()> {
    let text = non_empty(text)?;
    print_todos(&describe(ctx.client.add(text).await, "Failed to add todo")?);
    Ok(())
}

/// Execute the edit command
pub async fn edit(ctx: &mut Context, id: u32, text: &str) -> Result<()> {
    let text = non_empty(text)?;
    print_todos(&describe(ctx.client.edit(id, text).await, "Failed to update todo")?);
    Ok(())
}

/// Execute the done command
pub async fn done(ctx: &mut Context, id: u32) -> Result<()> {
    print_todos(&describe(ctx.client.done(id).await, "Failed to mark todo as done")?);
    Ok(())
}

/// Execute the status command
pub fn status(ctx: &Context) -> Result<()> {
    println!("State file: {}", ctx.client.store().path().display());
    println!("Sheet name: {}", ctx.config.sheet_name);

    match ctx.client.session().state() {
        SessionState::Unauthenticated => {
            println!("Not signed in. Run `todosheets login`");
            if let Some(id) = ctx.client.session().spreadsheet_id() {
                println!("Remembered spreadsheet: {}", id);
            }
        }
        SessionState::Authenticated => {
            println!("Signed in, no spreadsheet selected. Run `todosheets sheets`");
        }
        SessionState::SheetSelected(id) => {
            println!("Signed in, spreadsheet: {}", id);
        }
    }
    Ok(())
}

/// Execute the weather command
pub async fn weather(config: &Config, location: &str) -> Result<()> {
    let client = WeatherClient::new(config).context("Failed to create HTTP client")?;

    let report = client
        .lookup(location)
        .await
        .with_context(|| format!("Failed to fetch weather for {}", location))?;

    println!("Current weather for {}", location);
    println!("  Temperature: {}°F", report.temperature_f);
    println!("  Conditions: {}", report.description);
    Ok(())
}
