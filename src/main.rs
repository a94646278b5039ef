use clap::{error::ErrorKind, CommandFactory, Parser, Subcommand};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use env_logger::{Env, Target};
use lull::{
    app_dirs::AppDirs,
    backend::{IdentityProvider, Notification, Notifier, StaticIdentity},
    clock::{Clock, SystemClock},
    config::{Config, ConfigStore, FileConfigStore},
    monitor::{Monitor, TICK_INTERVAL},
    policy::LevelBands,
    recorder::SessionRecorder,
    runtime::{CrosstermEventSource, FixedTicker, MonitorEvent, MonitorEventSource, Runner, Ticker},
    scoring::{Jitter, NoJitter, RandomJitter},
    session::FatigueSession,
    store::{NewEmployee, SqliteStore},
    ui::MonitorScreen,
    util::format_clock,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Frame, Terminal,
};
use std::{
    error::Error,
    fs::{self, OpenOptions},
    io::{self, stdin},
    path::PathBuf,
    time::{Duration, Instant},
};

const REFRESH_MS: u64 = 100;
/// Typed text kept for display; older input is dropped
const TYPED_LIMIT: usize = 8_192;

/// typing fatigue monitor with automatic breaks
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A terminal typing monitor that estimates fatigue from your typing rhythm, enforces short breaks when the score gets too high, and keeps a history of your sessions."
)]
pub struct Cli {
    #[clap(subcommand)]
    command: Option<Command>,

    /// fatigue score (0-100) that starts a break
    #[clap(short = 't', long)]
    threshold: Option<u8>,

    /// length of an enforced break in seconds
    #[clap(short = 'b', long)]
    break_secs: Option<u32>,

    /// save a reading every this many seconds of monitoring
    #[clap(long)]
    reading_secs: Option<u64>,

    /// leave the random term out of the score
    #[clap(long)]
    no_jitter: bool,

    /// user name linked to an employee record (defaults to $USER)
    #[clap(short = 'u', long, global = true)]
    user: Option<String>,

    /// session database to use instead of the default one
    #[clap(long, global = true)]
    db: Option<PathBuf>,

    /// write the effective settings to the config file
    #[clap(long)]
    save_config: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
enum Command {
    /// link a user name to an employee record so sessions get saved
    Enroll {
        #[clap(long)]
        name: String,
        #[clap(long, default_value = "")]
        department: String,
        #[clap(long, default_value = "")]
        position: String,
    },
    /// list recently recorded sessions
    History {
        #[clap(short = 'n', long, default_value_t = 10)]
        limit: usize,
    },
}

impl Cli {
    /// Flags win over the config file
    fn apply(&self, cfg: &mut Config) {
        if let Some(threshold) = self.threshold {
            cfg.policy.threshold = threshold.min(100);
        }
        if let Some(secs) = self.break_secs {
            cfg.policy.break_secs = secs;
        }
        if let Some(secs) = self.reading_secs {
            cfg.policy.reading_interval_secs = secs;
        }
        if self.no_jitter {
            cfg.jitter = false;
        }
        if self.user.is_some() {
            cfg.user = self.user.clone();
        }
        if self.db.is_some() {
            cfg.db_path = self.db.clone();
        }
    }
}

pub struct App<C: Clock, J: Jitter> {
    pub monitor: Monitor<C, J>,
    pub typed: String,
    pub bands: LevelBands,
}

impl<C: Clock, J: Jitter> App<C, J> {
    pub fn new(monitor: Monitor<C, J>, bands: LevelBands) -> Self {
        Self {
            monitor,
            typed: String::new(),
            bands,
        }
    }

    /// Returns false once the user asked to quit
    pub fn on_key(&mut self, key: KeyEvent) -> bool {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => return false,
            KeyCode::Char('c') if ctrl => return false,
            KeyCode::Char('s') if ctrl => self.monitor.toggle(),
            KeyCode::Char('r') if ctrl => {
                self.monitor.reset();
                self.typed.clear();
            }
            KeyCode::Char('b') if ctrl => {
                self.monitor.take_break();
            }
            KeyCode::Char(c) if !ctrl => {
                if self.monitor.keystroke() {
                    self.type_char(c);
                }
            }
            KeyCode::Enter | KeyCode::Tab => {
                if self.monitor.keystroke() {
                    self.type_char(' ');
                }
            }
            KeyCode::Backspace => {
                if self.monitor.keystroke() {
                    self.typed.pop();
                }
            }
            _ => {}
        }
        true
    }

    fn type_char(&mut self, c: char) {
        self.typed.push(c);
        if self.typed.len() > TYPED_LIMIT {
            let cut = self.typed.len() - TYPED_LIMIT / 2;
            let cut = (cut..self.typed.len())
                .find(|&i| self.typed.is_char_boundary(i))
                .unwrap_or(self.typed.len());
            self.typed.drain(..cut);
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if let Err(e) = init_logging() {
        eprintln!("logging disabled: {e}");
    }

    let config_store = FileConfigStore::new();
    let mut cfg = config_store.load();
    cli.apply(&mut cfg);
    if cli.save_config {
        config_store.save(&cfg)?;
        log::info!("saved settings to {}", config_store.path().display());
    }

    match cli.command {
        Some(Command::Enroll {
            name,
            department,
            position,
        }) => enroll(&cfg, name, department, position),
        Some(Command::History { limit }) => history(&cfg, limit),
        None => run_monitor(cfg),
    }
}

/// The terminal belongs to the UI, so log lines go to a file
fn init_logging() -> io::Result<()> {
    let Some(log_path) = AppDirs::log_path() else {
        return Ok(());
    };
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .target(Target::Pipe(Box::new(log_file)))
        .init();
    Ok(())
}

fn open_store(cfg: &Config) -> Result<SqliteStore, lull::backend::StoreError> {
    match &cfg.db_path {
        Some(path) => SqliteStore::open(path),
        None => SqliteStore::open_default(),
    }
}

fn enroll(
    cfg: &Config,
    name: String,
    department: String,
    position: String,
) -> Result<(), Box<dyn Error>> {
    let Some(user) = StaticIdentity::from_env_or(cfg.user.clone()).current_user() else {
        let mut cmd = Cli::command();
        cmd.error(
            ErrorKind::MissingRequiredArgument,
            "no user name, pass --user",
        )
        .exit();
    };
    let store = open_store(cfg)?;
    let id = store.enroll_employee(
        &user,
        &NewEmployee {
            full_name: name.clone(),
            department,
            position,
        },
    )?;
    println!("enrolled {name} ({id}) for user {user}");
    Ok(())
}

fn history(cfg: &Config, limit: usize) -> Result<(), Box<dyn Error>> {
    let store = open_store(cfg)?;
    let sessions = store.recent_sessions(limit)?;
    if sessions.is_empty() {
        println!("no sessions recorded yet");
        return Ok(());
    }

    println!(
        "{:<17} {:<20} {:>8} {:>6} {:>6} {:>10} {:>7}",
        "started", "employee", "length", "final", "breaks", "keystrokes", "product"
    );
    let dash = || "-".to_string();
    for s in sessions {
        let length = s
            .end
            .map(|end| format_clock((end - s.start).num_seconds().max(0) as u64))
            .unwrap_or_else(|| "open".to_string());
        println!(
            "{:<17} {:<20} {:>8} {:>6} {:>6} {:>10} {:>7}",
            s.start.format("%Y-%m-%d %H:%M").to_string(),
            s.employee_name,
            length,
            s.final_score.map_or_else(dash, |v| v.to_string()),
            s.break_count,
            s.keystrokes.map_or_else(dash, |v| v.to_string()),
            s.productivity.map_or_else(dash, |v| v.to_string()),
        );
    }
    Ok(())
}

fn run_monitor(cfg: Config) -> Result<(), Box<dyn Error>> {
    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let identity = Box::new(StaticIdentity::from_env_or(cfg.user.clone()));
    let (recorder, store_error) = match open_store(&cfg) {
        Ok(store) => (SessionRecorder::new(identity, Box::new(store)), None),
        Err(e) => {
            log::warn!("session history disabled: {e}");
            (SessionRecorder::offline(identity), Some(e))
        }
    };

    let jitter: Box<dyn Jitter> = if cfg.jitter {
        Box::new(RandomJitter::new())
    } else {
        Box::new(NoJitter)
    };
    let session = FatigueSession::new(SystemClock::new(), jitter, cfg.policy);
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(REFRESH_MS)),
    );
    let mut monitor = Monitor::new(session, recorder, runner.sender(), TICK_INTERVAL);
    if let Some(e) = store_error {
        monitor.toasts_mut().notify(Notification::new(
            "Session history disabled",
            format!("Could not open the session database: {e}"),
        ));
    }
    let mut app = App::new(monitor, cfg.bands);

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app, &runner);

    // closes the persisted session on the way out
    app.monitor.stop();

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B, C, J, E, T>(
    terminal: &mut Terminal<B>,
    app: &mut App<C, J>,
    runner: &Runner<E, T>,
) -> Result<(), Box<dyn Error>>
where
    B: Backend,
    C: Clock,
    J: Jitter,
    E: MonitorEventSource,
    T: Ticker,
{
    terminal.draw(|f| ui(app, f))?;

    loop {
        match runner.step() {
            MonitorEvent::Key(key) => {
                if !app.on_key(key) {
                    break;
                }
            }
            MonitorEvent::Timer(tag) => app.monitor.on_timer(tag),
            MonitorEvent::Resize | MonitorEvent::Refresh => {}
        }
        app.monitor.toasts_mut().expire(Instant::now());
        terminal.draw(|f| ui(app, f))?;
    }

    Ok(())
}

fn ui<C: Clock, J: Jitter>(app: &App<C, J>, f: &mut Frame) {
    f.render_widget(
        MonitorScreen {
            monitor: &app.monitor,
            typed: &app.typed,
            bands: app.bands,
        },
        f.area(),
    );
}
