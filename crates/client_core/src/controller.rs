use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use tokio::sync::{broadcast, mpsc};
use tracing::debug;

use crate::{
    config::ClientSettings,
    notifications::{NotificationCenter, NotificationId},
    view::{project, View},
    workflow::{transition, Command, Completion, Effect, Event, Request, Workflow},
    CompileService,
};

const EFFECT_CHANNEL_CAPACITY: usize = 64;

pub struct WorkflowController {
    service: Arc<dyn CompileService>,
    workflow: Workflow,
    notifications: NotificationCenter,
    completion_tx: mpsc::UnboundedSender<Completion>,
    completion_rx: mpsc::UnboundedReceiver<Completion>,
    outstanding: usize,
    effects: broadcast::Sender<Effect>,
}

impl WorkflowController {
    pub fn new(service: Arc<dyn CompileService>, settings: &ClientSettings) -> Self {
        Self::with_workflow(
            service,
            Workflow::new(settings.artifact_layout()),
            settings.notification_ttl(),
        )
    }

    pub fn with_workflow(
        service: Arc<dyn CompileService>,
        workflow: Workflow,
        notification_ttl: Duration,
    ) -> Self {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        let (effects, _) = broadcast::channel(EFFECT_CHANNEL_CAPACITY);
        Self {
            service,
            workflow,
            notifications: NotificationCenter::new(notification_ttl),
            completion_tx,
            completion_rx,
            outstanding: 0,
            effects,
        }
    }

    pub fn dispatch(&mut self, command: Command) -> Vec<Effect> {
        self.apply(Event::Command(command))
    }

    pub fn has_outstanding(&self) -> bool {
        self.outstanding > 0
    }

    /// Waits for the next network answer and applies it; `None` when nothing is outstanding.
    pub async fn next_completion(&mut self) -> Option<Vec<Effect>> {
        if self.outstanding == 0 {
            return None;
        }
        let completion = self.completion_rx.recv().await?;
        self.outstanding -= 1;
        Some(self.apply(Event::Completion(completion)))
    }

    /// Drives every outstanding request (and any follow-up it triggers) to completion.
    pub async fn settle(&mut self) -> Vec<Effect> {
        let mut all = Vec::new();
        while let Some(effects) = self.next_completion().await {
            all.extend(effects);
        }
        all
    }

    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    pub fn view(&self) -> View {
        project(&self.workflow)
    }

    pub fn notifications(&self) -> &NotificationCenter {
        &self.notifications
    }

    pub fn dismiss_notification(&mut self, id: NotificationId) -> bool {
        self.notifications.dismiss(id)
    }

    pub fn expire_notifications(&mut self, now: Instant) -> usize {
        self.notifications.expire(now)
    }

    pub fn subscribe_effects(&self) -> broadcast::Receiver<Effect> {
        self.effects.subscribe()
    }

    fn apply(&mut self, event: Event) -> Vec<Effect> {
        let workflow = std::mem::take(&mut self.workflow);
        let (workflow, effects) = transition(workflow, event);
        self.workflow = workflow;

        let now = Instant::now();
        for effect in &effects {
            match effect {
                Effect::Request(request) => self.spawn(request.clone()),
                Effect::Notify { message } => {
                    self.notifications.raise(message.clone(), now);
                }
                _ => {}
            }
            // No subscribers is the normal case for headless use.
            let _ = self.effects.send(effect.clone());
        }
        effects
    }

    fn spawn(&mut self, request: Request) {
        let service = Arc::clone(&self.service);
        let completion_tx = self.completion_tx.clone();
        self.outstanding += 1;
        tokio::spawn(async move {
            let completion = execute(service.as_ref(), request).await;
            if completion_tx.send(completion).is_err() {
                debug!("controller dropped before a response arrived");
            }
        });
    }
}

pub async fn execute(service: &dyn CompileService, request: Request) -> Completion {
    match request {
        Request::UploadDocument { ticket, document } => Completion::Uploaded {
            ticket,
            result: service.upload_document(document).await,
        },
        Request::CompileMedia {
            ticket,
            folder,
            media,
        } => Completion::Compiled {
            ticket,
            result: service.compile_media(&folder, media).await,
        },
        Request::RecompileSource { ticket, submission } => Completion::Compiled {
            ticket,
            result: service.recompile_source(submission).await,
        },
        Request::FetchSource { ticket, path } => Completion::SourceFetched {
            ticket,
            result: service.fetch_source(&path).await,
        },
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
