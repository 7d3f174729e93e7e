use std::time::Instant;

use bevy_ecs::prelude::*;
use crossbeam::channel::Receiver;

use crate::{SessionController, SessionEvent, Transport};

/// Session controller stored as an ECS resource, together with the receiver
/// its notifications are pumped from.
#[derive(Resource)]
pub struct SessionResource<T: Transport + Send + Sync + 'static> {
    pub controller: SessionController<T>,
    events: Receiver<SessionEvent>,
}

impl<T: Transport + Send + Sync + 'static> SessionResource<T> {
    pub fn new(mut controller: SessionController<T>) -> Self {
        let events = controller.subscribe();
        Self { controller, events }
    }
}

/// Session notification surfaced to gameplay and UI systems.
#[derive(Event, Debug, Clone, PartialEq, Eq)]
pub struct SessionNotification(pub SessionEvent);

/// Advances the session and forwards its notifications as ECS events.
pub fn pump_session<T: Transport + Send + Sync + 'static>(
    mut session: ResMut<SessionResource<T>>,
    mut writer: EventWriter<SessionNotification>,
) {
    session.controller.update(Instant::now());
    for event in session.events.try_iter() {
        writer.write(SessionNotification(event));
    }
}
