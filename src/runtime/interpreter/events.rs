use crate::runtime::{data_structures::value::Value, error::ScriptError};
use std::{cell::RefCell, collections::VecDeque, rc::Rc};

/// Observer of an evaluation.  Every callback is advisory, the results of an evaluation are the
/// same whether or not a sink is attached.
pub trait EventSink {
    /// A word is about to run.
    fn word_starting(&mut self, name: &str, signature: &str);

    /// A word has finished running, with a snapshot of the data stack after it.
    fn word_complete(&mut self, name: &str, stack: &[Value]);

    /// Text printed by the script.
    fn output(&mut self, text: &str);

    /// The evaluation failed.
    fn error_occurred(&mut self, error: &ScriptError);

    /// Called after `word_complete` in synchronized mode.  The engine carries on once this
    /// returns, so a sink pacing an animation blocks here until it's ready.
    fn acknowledge(&mut self, _name: &str) {}
}

/// An event as recorded by the EventQueue.
#[derive(Clone, Debug)]
pub enum EngineEvent {
    WordStarting { name: String, signature: String },
    WordComplete { name: String, stack: Vec<Value> },
    Output(String),
    ErrorOccurred(ScriptError),
}

/// A bounded queue of events for embedders that would rather poll than be called back.  Clones
/// share the same queue, so one handle can be given to the interpreter and the other kept for
/// polling.  When the queue is full the oldest event is dropped.
#[derive(Clone)]
pub struct EventQueue {
    events: Rc<RefCell<VecDeque<EngineEvent>>>,
    capacity: usize,
}

impl EventQueue {
    pub fn new(capacity: usize) -> EventQueue {
        EventQueue {
            events: Rc::new(RefCell::new(VecDeque::new())),
            capacity: capacity.max(1),
        }
    }

    /// Take the oldest event.
    pub fn poll(&self) -> Option<EngineEvent> {
        self.events.borrow_mut().pop_front()
    }

    /// Take every queued event, oldest first.
    pub fn drain(&self) -> Vec<EngineEvent> {
        self.events.borrow_mut().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    fn record(&self, event: EngineEvent) {
        let mut events = self.events.borrow_mut();

        if events.len() >= self.capacity {
            let _ = events.pop_front();
        }

        events.push_back(event);
    }
}

impl EventSink for EventQueue {
    fn word_starting(&mut self, name: &str, signature: &str) {
        self.record(EngineEvent::WordStarting {
            name: name.to_string(),
            signature: signature.to_string(),
        });
    }

    fn word_complete(&mut self, name: &str, stack: &[Value]) {
        self.record(EngineEvent::WordComplete {
            name: name.to_string(),
            stack: stack.to_vec(),
        });
    }

    fn output(&mut self, text: &str) {
        self.record(EngineEvent::Output(text.to_string()));
    }

    fn error_occurred(&mut self, error: &ScriptError) {
        self.record(EngineEvent::ErrorOccurred(error.clone()));
    }
}
