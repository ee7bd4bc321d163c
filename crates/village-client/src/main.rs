use std::process::ExitCode;
use std::time::Instant;

use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing_subscriber::EnvFilter;

use village_client::render::{render_directory, render_room};
use village_client::{
    ApiClient, ClientConfig, ClientError, CreateRoomRequest, CredentialStore, Directory,
    Navigation, Session, SessionSettings, SubmitOutcome, auth,
};
use village_core::eligibility::ActionTag;
use village_core::room::{DEFAULT_MAX_PLAYERS, RoomId};

const USAGE: &str = "\
usage: village <command>

  login <username> <password>
  register <username> <email> <password>
  logout
  rooms
  create <name> [max-players] [join-key]
  delete <room-id>
  join <room-id> [join-key]
  play <room-id>";

const PLAY_HELP: &str = "\
commands:
  select <username>   pick the target for your next action
  act <action>        vote, protect, hunt, inspect, poison, kill, watch
  advance             admin: move the game to its next phase
  timer [seconds]     admin: start the decision timer (default 60)
  stop-timer          admin: stop the decision timer
  kick <username>     admin: remove a player
  show                redraw the room
  refresh             sync with the server now
  quit                leave the room view";

type InputLines = Lines<BufReader<Stdin>>;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.user_message(&e.to_string()));
            ExitCode::FAILURE
        },
    }
}

async fn run(args: &[String]) -> Result<(), ClientError> {
    let config = ClientConfig::load();
    config.validate()?;
    let api = ApiClient::new(&config.server_url, config.sync.request_timeout())?;
    let credentials = CredentialStore::new(&config.credentials_path);

    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    match args.as_slice() {
        ["login", username, password] => {
            let creds = auth::login(&api, &credentials, username, password).await?;
            println!("Logged in as {}", creds.username);
        },
        ["register", username, email, password] => {
            auth::register(&api, username, email, password).await?;
            println!("Registered {username}. You can log in now.");
        },
        ["logout"] => {
            auth::logout(&credentials)?;
            println!("Logged out");
        },
        ["rooms"] => {
            let directory = open_directory(&api, &config, &credentials)?;
            directory.refresh().await?;
            let store = directory.store();
            let store = store.read().await;
            println!("{}", render_directory(&store, &directory.credentials().username));
        },
        ["create", name, rest @ ..] if rest.len() <= 2 => {
            let max_players = match rest.first() {
                Some(raw) => raw
                    .parse::<u32>()
                    .map_err(|_| ClientError::Invalid(format!("not a number: {raw}")))?,
                None => DEFAULT_MAX_PLAYERS,
            };
            let request = CreateRoomRequest::new(name, max_players, rest.get(1).copied())?;
            let directory = open_directory(&api, &config, &credentials)?;
            let room = directory.create_room(&request).await?;
            println!("Created room #{} {}", room.id, room.name);
        },
        ["delete", room_id] => {
            let room_id = parse_room_id(room_id)?;
            let directory = open_directory(&api, &config, &credentials)?;
            let _ = directory.refresh().await;
            if directory.delete_room(room_id, &confirm_stdin).await? {
                println!("Deleted room #{room_id}");
            }
        },
        ["join", room_id, rest @ ..] if rest.len() <= 1 => {
            let room_id = parse_room_id(room_id)?;
            let directory = open_directory(&api, &config, &credentials)?;
            directory
                .join_room(room_id, rest.first().copied().unwrap_or(""))
                .await?;
            println!("Joined room #{room_id}. Run `village play {room_id}` to enter.");
        },
        ["play", room_id] => {
            let room_id = parse_room_id(room_id)?;
            play(api, &config, credentials, room_id).await?;
        },
        _ => println!("{USAGE}"),
    }
    Ok(())
}

fn open_directory(
    api: &ApiClient,
    config: &ClientConfig,
    credentials: &CredentialStore,
) -> Result<Directory, ClientError> {
    Directory::start(
        api.clone(),
        credentials.load()?,
        config.sync.directory_interval(),
        Some(credentials.clone()),
    )
}

fn parse_room_id(raw: &str) -> Result<RoomId, ClientError> {
    raw.trim_start_matches('#')
        .parse()
        .map_err(|_| ClientError::Invalid(format!("not a room id: {raw}")))
}

/// Blocking y/N prompt, for commands that run outside the play loop.
fn confirm_stdin(prompt: &str) -> bool {
    eprint!("{prompt} [y/N] ");
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer).is_ok() && is_yes(&answer)
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

async fn play(
    api: ApiClient,
    config: &ClientConfig,
    credentials: CredentialStore,
    room_id: RoomId,
) -> Result<(), ClientError> {
    let creds = credentials.load()?;
    let settings = SessionSettings::from_config(config);
    let default_timer = settings.decision_timer_secs;
    let (session, mut events) = Session::start(api, creds, room_id, settings, Some(credentials))?;
    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut last_frame = String::new();
    println!("{PLAY_HELP}");

    loop {
        tokio::select! {
            navigation = events.navigation.recv() => {
                match navigation {
                    Some(Navigation::Directory) => println!("You are no longer in this room."),
                    Some(Navigation::Login) => println!("Please log in again."),
                    None => {},
                }
                break;
            },
            changed = events.changes.changed() => {
                if changed.is_err() {
                    break;
                }
                redraw(&session, &mut last_frame, false).await;
            },
            line = input.next_line() => {
                let Ok(Some(line)) = line else { break };
                if !handle_command(&session, line.trim(), default_timer, &mut input).await {
                    break;
                }
                redraw(&session, &mut last_frame, true).await;
            },
        }
    }
    session.teardown().await;
    Ok(())
}

/// Print the room when something other than the countdown changed, or
/// always when `force` is set.
async fn redraw(session: &Session, last_frame: &mut String, force: bool) {
    let store = session.store();
    let frame = render_room(&*store.read().await, Instant::now());
    let without_timer = |s: &str| {
        s.lines()
            .filter(|l| !l.starts_with("Timer:"))
            .collect::<Vec<_>>()
            .join("\n")
    };
    if force || without_timer(&frame) != without_timer(last_frame) {
        println!("\n{frame}");
    }
    *last_frame = frame;
}

/// Returns false when the user asked to leave.
async fn handle_command(
    session: &Session,
    line: &str,
    default_timer: u32,
    input: &mut InputLines,
) -> bool {
    let mut words = line.split_whitespace();
    let command = words.next().unwrap_or("");
    let arg = words.next();
    match (command, arg) {
        ("", _) | ("show", _) => {},
        ("quit" | "exit", _) => return false,
        ("help", _) => println!("{PLAY_HELP}"),
        ("select", Some(username)) => {
            if !session.select_target(username).await {
                println!("{username} cannot be targeted");
            }
        },
        ("act", Some(action)) => match action.parse::<ActionTag>() {
            Ok(action) => report(session.submit_action(action).await),
            Err(e) => println!("{e}"),
        },
        ("advance", _) => report(session.advance_phase().await),
        ("timer", seconds) => {
            match seconds.map_or(Ok(default_timer), str::parse::<u32>) {
                Ok(seconds) => report(session.start_timer(seconds).await),
                Err(_) => println!("timer takes a number of seconds"),
            }
        },
        ("stop-timer", _) => report(session.stop_timer().await),
        ("kick", Some(username)) => {
            println!("Kick {username} from the room? [y/N]");
            let answer = matches!(input.next_line().await, Ok(Some(a)) if is_yes(&a));
            report(session.kick_player(username, &|_: &str| answer).await);
        },
        ("refresh", _) => session.resync_now(),
        _ => println!("unknown command, try `help`"),
    }
    true
}

fn report(outcome: SubmitOutcome) {
    match outcome {
        SubmitOutcome::Applied | SubmitOutcome::NoTarget | SubmitOutcome::Failed(_) => {},
        SubmitOutcome::Busy => println!("still waiting for the previous request"),
        SubmitOutcome::Declined => println!("cancelled"),
        SubmitOutcome::NotAllowed => println!("not available right now"),
        SubmitOutcome::Ended => println!("session has ended"),
    }
}
