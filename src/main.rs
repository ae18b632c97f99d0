use std::sync::Arc;

use anyhow::{bail, Context, Result};

use connectui::cli::{Command, Flags};
use connectui::controllers::post_controller;
use connectui::i18n::{runtime_locale, LocaleCatalog};
use connectui::models::{default_session_file, Config, Credentials, HttpApi};
use connectui::{logging, start_app, Session};

#[tokio::main]
async fn main() -> Result<()> {
    //Get Flags
    let flags = Flags::from_args();

    let config = match &flags.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let log_path = logging::init_logging(&logging::default_log_dir()?)?;
    log::info!("logging to {:?}", log_path);

    let mut catalog = LocaleCatalog::bundled()?;
    if let Some(dir) = &config.locales_dir {
        let loaded = catalog
            .load_overrides(dir)
            .with_context(|| format!("Failed to load locale overrides from {:?}", dir))?;
        log::info!("loaded {} locale override table(s) from {:?}", loaded, dir);
    }

    let api = HttpApi::new(&config.api_url)?.with_session_file(default_session_file()?)?;
    let mut session = Session::new(
        Arc::new(api),
        Arc::new(catalog),
        runtime_locale(),
        flags.locale.clone().or_else(|| config.locale.clone()),
    );

    match flags.command() {
        Command::Languages => {
            for (code, name) in session.translator().available_languages() {
                println!("{code}\t{name}");
            }
            return Ok(());
        }
        Command::Logout => {
            session.sign_out().await?;
            println!("{}", session.translator().t("auth.logged_out"));
            return Ok(());
        }
        _ => {}
    }

    if session.authenticate().await?.is_none() {
        let Some((handle, password)) = config.credentials() else {
            bail!("{}", session.translator().t("auth.login_failed"));
        };
        let credentials = Credentials {
            handle: handle.to_string(),
            password: password.to_string(),
        };
        session.login(&credentials).await?;
    }

    match flags.command() {
        Command::Languages | Command::Logout => {}
        Command::Post => {
            let note = post_controller::create_post_via_editor()?;
            session.submit_post(&note).await?;
            println!("{}", session.translator().t("post.published"));
        }
        Command::Notifications => {
            session.refresh_notifications().await?;
            let t = session.translator();
            let reconciler = session.reconciler();
            println!("{}", t.tp("notifications.unread", reconciler.unread_notifications() as u64));
            if reconciler.notifications().is_empty() {
                println!("{}", t.t("notifications.empty"));
            }
            let now = chrono::Utc::now();
            for n in reconciler.notifications() {
                let marker = if n.is_read { ' ' } else { '*' };
                println!("{} {} ({})", marker, n.message, t.format_relative_time(n.created_at, now));
            }
        }
        Command::Timeline => {
            session.refresh_timeline().await?;
            session.connect_push(&config.push_url(), config.reconnect_delay());
            start_app(&mut session).await?;
        }
    }

    Ok(())
}
