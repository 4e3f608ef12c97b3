use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use std::cell::RefCell;
use std::io::{self, BufRead, Write};
use std::rc::Rc;
use studysync_cli::cli::{Cli, Command, TimerCommand, collect_config_overrides};
use studysync_cli::render;
use studysync_core::app::App;
use studysync_core::config::{self, Config, Palette};
use studysync_core::error::AppError;
use studysync_core::model::{Task, TaskDraft};
use studysync_core::notify::{self, Notice, Notifier};
use studysync_core::storage::{JsonFileStore, PersistentStore};
use studysync_core::tasks::TaskFilter;
use studysync_core::timer::{Completion, ThreadTicker, TimerMode};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const LOG_ENV_VAR: &str = "STUDYSYNC_LOG";

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false),
        )
        .try_init();
}

/// Queues notices raised during a command so they print after its output,
/// and forwards each one to the desktop when enabled.
struct ConsoleNotifier {
    pending: RefCell<Vec<Notice>>,
    desktop: Option<Box<dyn Notifier>>,
}

impl ConsoleNotifier {
    fn new(desktop: Option<Box<dyn Notifier>>) -> Self {
        Self {
            pending: RefCell::new(Vec::new()),
            desktop,
        }
    }

    fn flush(&self, json: bool) {
        for notice in self.pending.borrow_mut().drain(..) {
            // Validation messages already surface through the error line.
            if json || matches!(notice, Notice::Validation(_)) {
                continue;
            }
            println!("{}", notice.message());
        }
    }
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: &Notice) -> Result<(), AppError> {
        self.pending.borrow_mut().push(notice.clone());
        match &self.desktop {
            Some(desktop) => desktop.notify(notice),
            None => Ok(()),
        }
    }
}

struct Runtime {
    app: App,
    config: Config,
    palette: Palette,
    console: Rc<ConsoleNotifier>,
    json: bool,
}

impl Runtime {
    fn open(cli: &Cli) -> Result<Self, AppError> {
        let loaded = config::load_config_with_fallback();
        if let Some(err) = &loaded.error {
            warn!(error = %err, "config not loaded, using defaults");
        }
        let overrides =
            collect_config_overrides(&cli.config_override).map_err(AppError::invalid_input)?;
        let config = config::merge_overrides(&loaded.config, &overrides);

        let desktop = if config.notifications_enabled() {
            Some(notify::notifier_from_env()?)
        } else {
            None
        };
        let console = Rc::new(ConsoleNotifier::new(desktop));

        let backend = JsonFileStore::open_default()?;
        debug!(path = %backend.path().display(), "opening store");
        let store = PersistentStore::new(Rc::new(backend));
        let notifier: Rc<dyn Notifier> = console.clone();
        let app = App::open(store, notifier);

        let palette = config::palette_for_theme(config.theme.unwrap_or_else(|| app.theme()));
        Ok(Self {
            app,
            config,
            palette,
            console,
            json: cli.json,
        })
    }

    fn refresh_palette(&mut self) {
        self.palette =
            config::palette_for_theme(self.config.theme.unwrap_or_else(|| self.app.theme()));
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), AppError> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

fn print_task(runtime: &Runtime, verb: &str, task: &Task) -> Result<(), AppError> {
    if runtime.json {
        print_json(task)
    } else {
        println!(
            "{} task: {} ({})",
            verb,
            runtime.palette.accentize(&task.name),
            task.id
        );
        Ok(())
    }
}

fn normalize_parse_error(err: clap::Error) -> AppError {
    let rendered = err.to_string();
    let first_line = rendered.lines().next().unwrap_or("invalid command").trim();
    let message = first_line
        .strip_prefix("error: ")
        .unwrap_or(first_line)
        .to_string();
    AppError::invalid_input(message)
}

fn split_command_line(line: &str) -> Result<Vec<String>, AppError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escape = false;

    for ch in line.chars() {
        if escape {
            if ch != '"' && ch != '\\' {
                current.push('\\');
            }
            current.push(ch);
            escape = false;
            continue;
        }

        if in_quotes && ch == '\\' {
            escape = true;
            continue;
        }

        if ch == '"' {
            in_quotes = !in_quotes;
            continue;
        }

        if ch.is_whitespace() && !in_quotes {
            if !current.is_empty() {
                args.push(std::mem::take(&mut current));
            }
            continue;
        }

        current.push(ch);
    }

    if in_quotes {
        return Err(AppError::invalid_input("unterminated quote in command"));
    }

    if !current.is_empty() {
        args.push(current);
    }

    Ok(args)
}

fn print_help() {
    let mut cmd = Cli::command();
    let help = cmd.render_help();
    println!("{help}");
}

fn run_timer(runtime: &Runtime, mode: TimerMode) -> Result<(), AppError> {
    let (ticker, ticks) = ThreadTicker::new();
    let mut timer = runtime.app.timer(ticker, runtime.config.durations());
    timer.set_mode(mode);
    timer.toggle();

    let stdout = io::stdout();
    if !runtime.json {
        println!("{}", runtime.palette.accentize(&render::timer_header(&timer)));
        print!("{}", timer.display());
        stdout.lock().flush().map_err(|err| AppError::io(err.to_string()))?;
    }

    let completion = loop {
        ticks
            .recv()
            .map_err(|_| AppError::io("timer tick source stopped unexpectedly"))?;
        if let Some(completion) = timer.tick() {
            break completion;
        }
        if !runtime.json {
            print!("\r{}", timer.display());
            stdout.lock().flush().map_err(|err| AppError::io(err.to_string()))?;
        }
    };

    if runtime.json {
        let finished = match completion {
            Completion::Focus { .. } => TimerMode::Focus,
            Completion::Break { mode } => mode,
        };
        print_json(&serde_json::json!({
            "completed": finished.label(),
            "next": timer.mode().label(),
            "total_pomodoros": timer.total_pomodoros(),
        }))?;
    } else {
        println!("\r00:00");
    }
    Ok(())
}

fn run_command(cli: Cli) -> Result<(), AppError> {
    let mut runtime = Runtime::open(&cli)?;
    let result = dispatch(&mut runtime, cli.command);
    runtime.console.flush(runtime.json);
    result
}

fn dispatch(runtime: &mut Runtime, command: Command) -> Result<(), AppError> {
    match command {
        Command::Add {
            name,
            subject,
            deadline,
            priority,
            status,
        } => {
            let task = runtime.app.add_task(TaskDraft {
                name: name.unwrap_or_default(),
                subject,
                deadline,
                priority,
                status,
            })?;
            print_task(runtime, "Added", &task)?;
        }
        Command::List { priority, status } => {
            let tasks = runtime.app.list_tasks(&TaskFilter { priority, status });
            if runtime.json {
                print_json(&tasks)?;
            } else {
                println!("{}", render::task_table(&tasks));
            }
        }
        Command::Toggle { id } => {
            let task = runtime
                .app
                .toggle_task(id)
                .ok_or_else(|| AppError::invalid_input("task not found"))?;
            let verb = if task.is_completed() {
                "Completed"
            } else {
                "Reopened"
            };
            print_task(runtime, verb, &task)?;
        }
        Command::Delete { id } => {
            let task = runtime
                .app
                .delete_task(id)
                .ok_or_else(|| AppError::invalid_input("task not found"))?;
            print_task(runtime, "Deleted", &task)?;
        }
        Command::Dashboard => {
            let dashboard = runtime.app.dashboard();
            if runtime.json {
                print_json(&dashboard)?;
            } else {
                println!("{}", render::dashboard_text(&dashboard, &runtime.palette));
            }
        }
        Command::Progress => {
            let progress = runtime.app.progress();
            if runtime.json {
                print_json(&progress)?;
            } else {
                println!("{}", render::progress_text(&progress, &runtime.palette));
            }
        }
        Command::Timer { timer } => match timer {
            TimerCommand::Run { mode } => run_timer(runtime, mode)?,
            TimerCommand::Status => {
                let durations = runtime.config.durations();
                let total = runtime.app.total_pomodoros();
                if runtime.json {
                    print_json(&serde_json::json!({
                        "total_pomodoros": total,
                        "focus_seconds": durations.focus,
                        "short_break_seconds": durations.short_break,
                        "long_break_seconds": durations.long_break,
                    }))?;
                } else {
                    println!("Pomodoros completed: {total}");
                    for mode in [TimerMode::Focus, TimerMode::ShortBreak, TimerMode::LongBreak] {
                        let seconds = durations.duration_for(mode);
                        println!("{:<12} {:02}:{:02}", mode.label(), seconds / 60, seconds % 60);
                    }
                }
            }
        },
        Command::Login { email, password } => {
            let profile = runtime.app.login(&email, &password)?;
            if runtime.json {
                print_json(&profile)?;
            }
        }
        Command::Signup {
            name,
            email,
            password,
        } => {
            let profile = runtime.app.signup(&name, &email, &password)?;
            if runtime.json {
                print_json(&profile)?;
            }
        }
        Command::Theme { theme } => {
            let theme = match theme {
                Some(theme) => runtime.app.set_theme(theme),
                None => runtime.app.toggle_theme(),
            };
            runtime.refresh_palette();
            if runtime.json {
                print_json(&serde_json::json!({ "theme": theme }))?;
            } else {
                println!("Theme: {}", runtime.palette.accentize(theme.as_str()));
            }
        }
    }

    Ok(())
}

fn run_interactive() -> Result<(), AppError> {
    let mut input = String::new();
    let stdin = io::stdin();
    let mut stdin_lock = stdin.lock();

    loop {
        input.clear();
        let bytes = stdin_lock
            .read_line(&mut input)
            .map_err(|err| AppError::io(err.to_string()))?;

        if bytes == 0 {
            break;
        }

        let line = input.trim();
        if line.is_empty() {
            continue;
        }

        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }

        if line == "help" || line == "?" {
            print_help();
            continue;
        }

        let args = match split_command_line(line) {
            Ok(args) => args,
            Err(err) => {
                eprintln!("ERROR: {}", err);
                continue;
            }
        };

        if args.is_empty() {
            continue;
        }

        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push("studysync".to_string());
        argv.extend(args);

        let cli = match Cli::try_parse_from(argv) {
            Ok(cli) => cli,
            Err(err) => {
                eprintln!("ERROR: {}", normalize_parse_error(err));
                continue;
            }
        };

        if let Err(err) = run_command(cli) {
            eprintln!("ERROR: {}", err);
        }
    }

    Ok(())
}

fn main() {
    init_tracing();

    let mut args = std::env::args_os();
    args.next();
    if args.next().is_none() {
        if let Err(err) = run_interactive() {
            eprintln!("ERROR: {}", err);
            std::process::exit(1);
        }
        return;
    }

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => {
            eprintln!("ERROR: {}", normalize_parse_error(err));
            std::process::exit(1);
        }
    };

    if let Err(err) = run_command(cli) {
        eprintln!("ERROR: {}", err);
        std::process::exit(1);
    }
}
