//! Shared fixtures for unit tests

use std::sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
};

use itertools::Itertools;
use web_time::Duration;

use crate::{
    catalog::Catalog,
    compose::{self, Backdrop, Composer, Layer},
    game::Message,
    scenario::{Position, Scenario, ScenarioDefinition, Size, SlotDefinition, Variant},
    session::{MessageId, Participant, Target, Transport},
};

/// A valid definition with one 100x100 slot per entry of `prompts`
pub(crate) fn definition(name: &str, prompts: &[&[&str]]) -> ScenarioDefinition {
    ScenarioDefinition {
        name: name.to_owned(),
        size: Size {
            width: 1000,
            height: 500,
        },
        background: "bg.png".to_owned(),
        foreground: None,
        slots: prompts
            .iter()
            .enumerate()
            .map(|(i, variants)| SlotDefinition {
                position: Position {
                    x: 100 * i as u32,
                    y: 0,
                },
                size: Size {
                    width: 100,
                    height: 100,
                },
                prompts: variants.iter().map(|p| (*p).to_owned()).collect_vec(),
            })
            .collect_vec(),
    }
}

/// An empty scenario with one single-variant slot per prompt
pub(crate) fn scenario(prompts: &[&str]) -> Scenario {
    let slots = prompts.iter().map(std::slice::from_ref).collect_vec();
    Scenario::instantiate(
        definition("Test scene", &slots).into(),
        Variant::Fixed(0),
        &mut fastrand::Rng::with_seed(0),
    )
}

/// Three scenarios with two, three and one slots
pub(crate) fn catalog() -> Catalog {
    Catalog::new(vec![
        definition("Duo", &[&["a cat", "a dog"], &["a hat", "a cap"]]),
        definition("Trio", &[&["a car"], &["a road"], &["a sign"]]),
        definition("Solo", &[&["a tree"]]),
    ])
    .unwrap()
}

pub(crate) fn participant(id: i64, name: &str) -> Participant {
    Participant::new(id, name)
}

/// [`Transport`] that records everything it is asked to deliver
#[derive(Debug, Default)]
pub(crate) struct RecordingTransport {
    next_id: AtomicUsize,
    messages: Mutex<Vec<(Target, Message)>>,
    images: Mutex<Vec<(Target, Vec<u8>, Message)>>,
    edits: Mutex<Vec<(Target, MessageId, Message)>>,
    pauses: Mutex<Vec<Duration>>,
}

impl RecordingTransport {
    pub(crate) fn messages_to(&self, target: Target) -> Vec<Message> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|(to, _)| *to == target)
            .map(|(_, message)| message.clone())
            .collect_vec()
    }

    pub(crate) fn images(&self) -> Vec<(Target, Vec<u8>, Message)> {
        self.images.lock().unwrap().clone()
    }

    pub(crate) fn edits(&self) -> Vec<Message> {
        self.edits
            .lock()
            .unwrap()
            .iter()
            .map(|(_, _, message)| message.clone())
            .collect_vec()
    }

    pub(crate) fn pauses(&self) -> Vec<Duration> {
        self.pauses.lock().unwrap().clone()
    }
}

impl Transport for RecordingTransport {
    fn send_message(&self, target: Target, message: &Message) -> Option<MessageId> {
        self.messages.lock().unwrap().push((target, message.clone()));
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        Some(MessageId::from(id as i64))
    }

    fn send_image(&self, target: Target, image: &[u8], caption: &Message) {
        self.images
            .lock()
            .unwrap()
            .push((target, image.to_vec(), caption.clone()));
    }

    fn edit_message(&self, target: Target, message_id: MessageId, message: &Message) {
        self.edits
            .lock()
            .unwrap()
            .push((target, message_id, message.clone()));
    }

    fn pause(&self, duration: Duration) {
        self.pauses.lock().unwrap().push(duration);
    }
}

/// [`Composer`] returning a fixed payload and counting its calls
#[derive(Debug, Default)]
pub(crate) struct StubComposer {
    calls: AtomicUsize,
}

impl StubComposer {
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Composer for StubComposer {
    fn compose(
        &self,
        _backdrop: &Backdrop<'_>,
        layers: &[Layer<'_>],
    ) -> Result<Vec<u8>, compose::Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![layers.len() as u8])
    }
}

/// [`Composer`] that always fails
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct FailingComposer;

impl Composer for FailingComposer {
    fn compose(
        &self,
        _backdrop: &Backdrop<'_>,
        _layers: &[Layer<'_>],
    ) -> Result<Vec<u8>, compose::Error> {
        Err(compose::Error::MissingImage(0))
    }
}
