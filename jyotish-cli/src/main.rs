use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate, NaiveTime};
use std::io::Write;
use std::sync::Arc;

use jyotish_client::{
    ApiClient, JyotishConfig, Meridiem, ProfileDraft, RegisterRequest, SessionPhase, SessionStore,
    TimePart, TimePicker, TokenStore,
};

const USAGE: &str = "\
jyotish <command>

Commands:
  login [email]       Log in and persist the session token
  register            Create an account and log in
  logout              Drop the persisted session
  whoami              Show the logged-in user and their profiles
  profiles list       List birth profiles
  profiles add        Add a birth profile (see `profiles add --help`)
  profiles rm <id>    Delete a birth profile

Set JYOTISH_DEV=1 to run against the built-in in-memory backend.";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let store = build_store()?;

    match args.first().map(String::as_str) {
        Some("login") => login(&store, args.get(1).map(String::as_str)).await,
        Some("register") => register(&store).await,
        Some("logout") => {
            store.logout();
            println!("Logged out.");
            Ok(())
        }
        Some("whoami") => whoami(&store).await,
        Some("profiles") => profiles(&store, &args[1..]).await,
        _ => {
            println!("{}", USAGE);
            Ok(())
        }
    }
}

fn build_store() -> Result<Arc<SessionStore>> {
    let api = if std::env::var("JYOTISH_DEV").is_ok_and(|v| v == "1") {
        ApiClient::dev()?
    } else {
        let config = JyotishConfig::load()?;
        ApiClient::new(&config.api_url)?
    };
    Ok(SessionStore::new(api, TokenStore::new()?))
}

/// Resolve the persisted token and load profiles, sequentially; the CLI
/// has no background UI to hand off to.
async fn load_session(store: &Arc<SessionStore>) -> Result<()> {
    store.resolve_user().await;
    if store.snapshot().phase != SessionPhase::Authenticated {
        bail!("Not logged in. Run `jyotish login` first.");
    }
    store.fetch_profiles().await?;
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    print!("{}: ", label);
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

async fn login(store: &Arc<SessionStore>, email: Option<&str>) -> Result<()> {
    let email = match email {
        Some(email) => email.to_string(),
        None => prompt("Email")?,
    };
    let password = rpassword::prompt_password("Password: ")?;

    store.login(&email, &password).await?;
    println!("Logged in. Session saved.");
    Ok(())
}

async fn register(store: &Arc<SessionStore>) -> Result<()> {
    let seed = RegisterRequest {
        full_name: prompt("Full name")?,
        email: prompt("Email")?,
        password: rpassword::prompt_password("Password: ")?,
        phone_number: {
            let raw = prompt("Phone (optional)")?;
            (!raw.is_empty()).then_some(raw)
        },
    };

    if store.register(&seed).await {
        println!("Account created. Session saved.");
        Ok(())
    } else {
        bail!("Registration failed.");
    }
}

async fn whoami(store: &Arc<SessionStore>) -> Result<()> {
    load_session(store).await?;
    let snapshot = store.snapshot();

    if let Some(user) = &snapshot.user {
        println!("{} <{}>", user.full_name, user.email);
    }
    print_profiles(store);
    Ok(())
}

fn print_profiles(store: &Arc<SessionStore>) {
    let snapshot = store.snapshot();
    if snapshot.profiles.is_empty() {
        println!("No profiles yet.");
        return;
    }
    for profile in &snapshot.profiles {
        let marker = if snapshot.active_profile_id == Some(profile.id) {
            "*"
        } else {
            " "
        };
        println!(
            "{} [{}] {}: {} {} at {}",
            marker, profile.id, profile.name, profile.birth_date, profile.birth_time, profile.location_name
        );
    }
}

async fn profiles(store: &Arc<SessionStore>, args: &[String]) -> Result<()> {
    match args.first().map(String::as_str) {
        Some("list") | None => {
            load_session(store).await?;
            print_profiles(store);
            Ok(())
        }
        Some("add") => {
            load_session(store).await?;
            let draft = parse_draft(&args[1..])?;
            let profile = store.add_profile(&draft).await?;
            println!("Added profile [{}] {}.", profile.id, profile.name);
            Ok(())
        }
        Some("rm") => {
            let id: i64 = args
                .get(1)
                .context("Usage: jyotish profiles rm <id>")?
                .parse()
                .context("Profile id must be a number")?;
            load_session(store).await?;
            store.delete_profile(id).await?;
            println!("Deleted profile [{}].", id);
            Ok(())
        }
        Some(other) => bail!("Unknown profiles command: {}\n\n{}", other, USAGE),
    }
}

const ADD_USAGE: &str = "\
jyotish profiles add --name <name> --birth-date <YYYY-MM-DD> \\
    --birth-time <'HH:MM AM|PM' or 24h 'HH:MM'> --location <place> \\
    --lat <deg> --lon <deg> [--gender g] [--relation r] \\
    [--profession p] [--marital-status m]";

fn parse_draft(args: &[String]) -> Result<ProfileDraft> {
    let mut name = None;
    let mut gender = "unspecified".to_string();
    let mut birth_date = None;
    let mut birth_time = None;
    let mut location_name = None;
    let mut latitude = None;
    let mut longitude = None;
    let mut relation = "self".to_string();
    let mut profession = String::new();
    let mut marital_status = String::new();

    let mut iter = args.iter();
    while let Some(flag) = iter.next() {
        if flag == "--help" {
            bail!("{}", ADD_USAGE);
        }
        let value = iter
            .next()
            .with_context(|| format!("Missing value for {}", flag))?;
        match flag.as_str() {
            "--name" => name = Some(value.clone()),
            "--gender" => gender = value.clone(),
            "--birth-date" => birth_date = Some(parse_birth_date(value)?),
            "--birth-time" => birth_time = Some(parse_birth_time(value)?),
            "--location" => location_name = Some(value.clone()),
            "--lat" => latitude = Some(value.parse().context("Invalid latitude")?),
            "--lon" => longitude = Some(value.parse().context("Invalid longitude")?),
            "--relation" => relation = value.clone(),
            "--profession" => profession = value.clone(),
            "--marital-status" => marital_status = value.clone(),
            other => bail!("Unknown flag: {}\n\n{}", other, ADD_USAGE),
        }
    }

    Ok(ProfileDraft {
        name: name.with_context(|| format!("--name is required\n\n{}", ADD_USAGE))?,
        gender,
        birth_date: birth_date
            .with_context(|| format!("--birth-date is required\n\n{}", ADD_USAGE))?,
        birth_time: birth_time
            .with_context(|| format!("--birth-time is required\n\n{}", ADD_USAGE))?,
        location_name: location_name
            .with_context(|| format!("--location is required\n\n{}", ADD_USAGE))?,
        latitude: latitude.with_context(|| format!("--lat is required\n\n{}", ADD_USAGE))?,
        longitude: longitude.with_context(|| format!("--lon is required\n\n{}", ADD_USAGE))?,
        relation,
        profession,
        marital_status,
    })
}

fn parse_birth_date(raw: &str) -> Result<NaiveDate> {
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("Invalid birth date {:?}, expected YYYY-MM-DD", raw))?;
    if date > Local::now().date_naive() {
        bail!("Birth date cannot be in the future");
    }
    Ok(date)
}

/// Accepts "HH:MM" (24-hour) or "HH:MM AM"/"HH:MM PM", going through the
/// same 12-hour conversion the interactive picker uses.
fn parse_birth_time(raw: &str) -> Result<NaiveTime> {
    let upper = raw.trim().to_ascii_uppercase();
    let (clock, meridiem) = if let Some(clock) = upper.strip_suffix("AM") {
        (clock.trim().to_string(), Some(Meridiem::Am))
    } else if let Some(clock) = upper.strip_suffix("PM") {
        (clock.trim().to_string(), Some(Meridiem::Pm))
    } else {
        (upper, None)
    };

    let (hour, minute) = clock
        .split_once(':')
        .with_context(|| format!("Invalid birth time {:?}, expected HH:MM", raw))?;

    match meridiem {
        Some(meridiem) => {
            let mut picker = TimePicker::new();
            picker.set_meridiem(meridiem);
            picker.set_part(TimePart::Hour, hour);
            picker.set_part(TimePart::Minute, minute);
            Ok(picker.value())
        }
        None => NaiveTime::parse_from_str(&format!("{}:{}", hour.trim(), minute.trim()), "%H:%M")
            .with_context(|| format!("Invalid birth time {:?}, expected HH:MM", raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn birth_time_accepts_12_hour_form() {
        assert_eq!(
            parse_birth_time("11:30 PM").unwrap(),
            NaiveTime::from_hms_opt(23, 30, 0).unwrap()
        );
        assert_eq!(
            parse_birth_time("12:05 am").unwrap(),
            NaiveTime::from_hms_opt(0, 5, 0).unwrap()
        );
    }

    #[test]
    fn birth_time_accepts_24_hour_form() {
        assert_eq!(
            parse_birth_time("06:45").unwrap(),
            NaiveTime::from_hms_opt(6, 45, 0).unwrap()
        );
    }

    #[test]
    fn birth_date_rejects_the_future() {
        assert!(parse_birth_date("2099-01-01").is_err());
        assert!(parse_birth_date("1990-05-12").is_ok());
    }

    #[test]
    fn draft_requires_the_core_fields() {
        let args: Vec<String> = ["--name", "Ravi"].iter().map(|s| s.to_string()).collect();
        assert!(parse_draft(&args).is_err());
    }
}
