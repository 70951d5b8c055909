// src/app.rs
//! Wires settings into the concrete collaborators.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::commands::CommandHandlers;
use crate::config::Settings;
use crate::enrich::OgEnricher;
use crate::ledger::{JsonFileStore, LinkLedger};
use crate::news::CryptoPanicSource;
use crate::notify::{DeliveryTarget, FooterLink, TelegramClient, TelegramSink};
use crate::price::PriceClient;
use crate::scheduler::{ChatTimers, Collaborators, DedupScheduler, SchedulerCfg, TimerCfg};

pub struct Relay {
    pub settings: Arc<Settings>,
    pub scheduler: Arc<DedupScheduler>,
    pub telegram: TelegramClient,
    pub chat_timers: Arc<ChatTimers>,
    pub handlers: Arc<CommandHandlers>,
}

impl Relay {
    pub fn build(settings: Settings) -> Result<Self> {
        let t = &settings.tunables;

        // One client for every outbound call; the timeout bounds how long a
        // cycle can hold the scheduler lock.
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(t.http_timeout_secs))
            .build()
            .context("building http client")?;

        let telegram =
            TelegramClient::new(&t.telegram_api_base, &settings.telegram_bot_token, http.clone());
        let footer = match (&t.footer_label, &t.footer_url) {
            (Some(label), Some(url)) => Some(FooterLink {
                label: label.clone(),
                url: url.clone(),
            }),
            _ => None,
        };

        let parts = Collaborators {
            source: Arc::new(CryptoPanicSource::new(
                &t.news_api_base,
                &settings.cryptopanic_api_key,
                http.clone(),
            )),
            enricher: Arc::new(OgEnricher::new(http.clone())),
            sink: Arc::new(TelegramSink::new(telegram.clone(), footer)),
        };

        let ledger = LinkLedger::load_or_empty(Box::new(JsonFileStore::new(&settings.ledger_path)));
        tracing::info!(
            path = %settings.ledger_path.display(),
            links = ledger.len(),
            "ledger loaded"
        );

        let scheduler = Arc::new(DedupScheduler::new(
            parts,
            ledger,
            DeliveryTarget::channel(settings.channel.clone()),
            SchedulerCfg {
                fetch_limit: t.fetch_limit,
                max_delivery_attempts: t.max_delivery_attempts,
            },
        ));

        let chat_timers = Arc::new(ChatTimers::new(scheduler.clone(), settings.chat_timer_cfg()));
        let handlers = Arc::new(CommandHandlers::new(
            scheduler.clone(),
            chat_timers.clone(),
            Arc::new(PriceClient::new(&t.price_api_base, http)),
        ));

        Ok(Self {
            settings: Arc::new(settings),
            scheduler,
            telegram,
            chat_timers,
            handlers,
        })
    }

    /// Channel sweep timer and the command poller.
    pub fn spawn_background(&self) {
        crate::scheduler::spawn_sweep_timer(self.scheduler.clone(), self.settings.sweep_timer_cfg());
        tokio::spawn(crate::bot::run_poller(
            self.telegram.clone(),
            self.handlers.clone(),
            self.settings.tunables.poll_timeout_secs,
        ));
    }
}

impl Settings {
    pub fn sweep_timer_cfg(&self) -> TimerCfg {
        TimerCfg {
            first_delay: Duration::from_secs(self.tunables.first_delay_secs),
            every: Duration::from_secs(self.tunables.sweep_interval_secs),
        }
    }

    pub fn chat_timer_cfg(&self) -> TimerCfg {
        TimerCfg {
            first_delay: Duration::from_secs(self.tunables.first_delay_secs),
            every: Duration::from_secs(self.tunables.chat_interval_secs),
        }
    }
}
