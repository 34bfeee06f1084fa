use crossbeam_channel::bounded;
use std::io;
use std::sync::Arc;
use std::thread;
use tracing::{error, info};

use irssinotify_module::config::RelayConfig;
use irssinotify_module::event_loop::{read_events, EventLoop, SessionState, EVENT_QUEUE_CAPACITY};
use irssinotify_module::settings_store::SqliteSettingsStore;
use irssinotify_module::{IrssiNotify, ModuleHooks, RelayDeliverer, MODULE_NAME};
use send_notification_module::NotifierClient;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_target(false).init();

    let config = RelayConfig::from_env()?;
    let client = NotifierClient::from_env()?;
    info!(
        "notifications go to {}; settings in {}; openssl at {}",
        client.message_url(),
        config.settings_path.display(),
        config.encrypt.binary.display()
    );

    let session = Arc::new(SessionState::new(config.nick.clone(), config.start_away));
    let store = SqliteSettingsStore::new(&config.settings_path, MODULE_NAME)?;
    let deliverer = RelayDeliverer::new(client, config.encrypt.clone());
    let mut module = IrssiNotify::new(
        session.clone(),
        Box::new(store),
        deliverer,
        config.pipeline_options(),
    );
    module.on_load(&config.load_args)?;

    let (sender, receiver) = bounded(EVENT_QUEUE_CAPACITY);
    thread::spawn(move || match read_events(io::stdin().lock(), sender) {
        Ok(count) => info!("input closed after {} event(s)", count),
        Err(err) => error!("failed to read events: {}", err),
    });

    let mut event_loop = EventLoop::new(module, session, receiver, config.poll_interval);
    let exit = event_loop.run();
    info!("event loop finished: {:?}", exit);
    Ok(())
}
