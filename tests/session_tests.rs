// Session level behavior: execution modes, events, cancellation and reset.

use fable::runtime::data_structures::value::Value;
use fable::runtime::error::{ErrorKind, ScriptError};
use fable::runtime::interpreter::events::{EngineEvent, EventSink};
use fable::runtime::interpreter::fable_interpreter::FableInterpreter;
use fable::runtime::interpreter::{EngineConfig, ExecutionMode, Interpreter, InterpreterStack,
                                  WordManagement};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::Ordering;

#[test]
fn step_mode_runs_one_operation_at_a_time() {
    let mut interp = FableInterpreter::new();

    interp.set_execution_mode(ExecutionMode::Step);
    interp.evaluate(": SQUARE DUP * ; 5 SQUARE").unwrap();

    assert!(interp.has_pending());
    assert!(interp.stack().is_empty());

    let mut steps = 0;

    while interp.step().unwrap() {
        steps += 1;
        assert!(steps < 100, "evaluation never finished");
    }

    assert_eq!(interp.stack(), &vec![Value::Int(25)]);
    assert!(!interp.has_pending());
    assert!(!interp.step().unwrap());
}

#[test]
fn step_mode_reports_errors_from_step() {
    let mut interp = FableInterpreter::new();

    interp.set_execution_mode(ExecutionMode::Step);
    interp.evaluate("1 + 2").unwrap();

    assert!(interp.step().unwrap());

    let error = interp.step().unwrap_err();

    assert!(matches!(error.kind(), ErrorKind::StackUnderflow { .. }));
    assert!(!interp.has_pending());
    assert_eq!(interp.stack(), &vec![Value::Int(1)]);
}

#[test]
fn events_follow_each_word() {
    let mut interp = FableInterpreter::new();
    let queue = interp.event_queue();

    interp.evaluate("1 2 + .").unwrap();

    let events = queue.drain();

    assert!(events.iter().any(|event| matches!(event,
        EngineEvent::WordStarting { name, .. } if name == "+")));
    assert!(events.iter().any(|event| matches!(event,
        EngineEvent::WordComplete { name, stack } if name == "+" && stack == &vec![Value::Int(3)])));
    assert!(events.iter().any(|event| matches!(event,
        EngineEvent::Output(text) if text == "3 ")));
}

#[test]
fn errors_are_reported_to_the_sink() {
    let mut interp = FableInterpreter::new();
    let queue = interp.event_queue();

    assert!(interp.evaluate("DROP").is_err());
    assert!(queue.drain().iter().any(|event| matches!(event, EngineEvent::ErrorOccurred(_))));
}

#[derive(Default)]
struct Recorder {
    acknowledged: Rc<RefCell<Vec<String>>>,
}

impl EventSink for Recorder {
    fn word_starting(&mut self, _name: &str, _signature: &str) {}

    fn word_complete(&mut self, _name: &str, _stack: &[Value]) {}

    fn output(&mut self, _text: &str) {}

    fn error_occurred(&mut self, _error: &ScriptError) {}

    fn acknowledge(&mut self, name: &str) {
        self.acknowledged.borrow_mut().push(name.to_string());
    }
}

#[test]
fn synchronized_mode_waits_for_acknowledgement() {
    let acknowledged = Rc::new(RefCell::new(Vec::new()));
    let mut interp = FableInterpreter::with_config(EngineConfig {
        execution_mode: ExecutionMode::Synchronized,
        ..EngineConfig::default()
    });

    interp.set_event_sink(Box::new(Recorder {
        acknowledged: acknowledged.clone(),
    }));
    interp.evaluate(": SQUARE DUP * ; 3 SQUARE").unwrap();

    assert_eq!(interp.stack(), &vec![Value::Int(9)]);
    assert_eq!(
        *acknowledged.borrow(),
        vec![":".to_string(), ";".to_string(), "DUP".to_string(), "*".to_string(),
             "SQUARE".to_string()]
    );
    assert!(interp.clear_event_sink().is_some());
    interp.evaluate("1 DROP").unwrap();
    assert_eq!(acknowledged.borrow().len(), 5);
}

#[test]
fn run_mode_never_acknowledges() {
    let acknowledged = Rc::new(RefCell::new(Vec::new()));
    let mut interp = FableInterpreter::new();

    interp.set_event_sink(Box::new(Recorder {
        acknowledged: acknowledged.clone(),
    }));
    interp.evaluate("1 DUP").unwrap();

    assert!(acknowledged.borrow().is_empty());
}

#[test]
fn cancellation_stops_a_runaway_loop() {
    let mut interp = FableInterpreter::new();

    interp.set_execution_mode(ExecutionMode::Step);
    interp.evaluate(": FOREVER BEGIN AGAIN ; FOREVER").unwrap();

    for _ in 0..100 {
        assert!(interp.step().unwrap());
    }

    interp.cancellation_flag().store(true, Ordering::SeqCst);

    assert_eq!(*interp.step().unwrap_err().kind(), ErrorKind::Cancelled);
    assert!(!interp.has_pending());
    assert!(!interp.cancellation_flag().load(Ordering::SeqCst));

    interp.set_execution_mode(ExecutionMode::Run);
    interp.evaluate("1").unwrap();
    assert_eq!(interp.stack(), &vec![Value::Int(1)]);
}

#[test]
fn runaway_recursion_overflows_the_return_stack() {
    let mut interp = FableInterpreter::with_config(EngineConfig {
        max_return_depth: 64,
        ..EngineConfig::default()
    });

    let error = interp.evaluate(": DEEP RECURSE ; DEEP").unwrap_err();

    assert_eq!(*error.kind(), ErrorKind::ReturnStackOverflow { depth: 64 });
    assert!(interp.return_stack().is_empty());
}

#[test]
fn variables_share_the_cell_limit() {
    let mut interp = FableInterpreter::with_config(EngineConfig {
        max_cells: 4,
        ..EngineConfig::default()
    });

    interp.evaluate("VARIABLE A 2 ALLOT VARIABLE B").unwrap();

    let error = interp.evaluate("VARIABLE C").unwrap_err();

    assert_eq!(
        *error.kind(),
        ErrorKind::MemoryExhausted {
            word: "VARIABLE".to_string(),
            requested: 1,
            available: 0
        }
    );
    assert!(!interp.dictionary().contains("C"));
    assert_eq!(interp.cells().here(), 4);
}

#[test]
fn session_source_rebuilds_the_definitions() {
    let mut interp = FableInterpreter::new();

    interp
        .evaluate(
            ": SQUARE DUP * ; 2.5 CONSTANT RATE VARIABLE COUNT 7 COUNT ! \
             : GONE 1 ; FORGET GONE : GREET .\" hi  there\" CR ;",
        )
        .unwrap();
    assert!(interp.evaluate(": BROKEN 1 IF ;").is_err());

    assert_eq!(
        interp.session_source(),
        ": SQUARE DUP * ;\n\
         2.5 CONSTANT RATE\n\
         VARIABLE COUNT 7 COUNT !\n\
         : GREET .\" hi  there\" CR ;\n"
    );
}

#[test]
fn reset_returns_to_the_session_mark() {
    let mut interp = FableInterpreter::new();
    let builtins = interp.dictionary().len();

    interp.evaluate(": X 1 ; VARIABLE V 1 2 3").unwrap();
    interp.reset();

    assert!(interp.stack().is_empty());
    assert_eq!(interp.dictionary().len(), builtins);
    assert_eq!(interp.cells().here(), 0);

    interp.evaluate("1 2 RESET 5").unwrap();
    assert_eq!(interp.stack(), &vec![Value::Int(5)]);
}

#[test]
fn marked_libraries_survive_reset() {
    let mut interp = FableInterpreter::new();

    interp.process_source("lib.f", ": DOUBLE 2* ;").unwrap();
    interp.mark_session();

    interp.evaluate(": TEMP 1 ;").unwrap();
    interp.reset();

    assert!(interp.dictionary().contains("DOUBLE"));
    assert!(!interp.dictionary().contains("TEMP"));
}

#[test]
fn errors_carry_locations_and_call_stacks() {
    let mut interp = FableInterpreter::new();

    let error = interp
        .process_source("calc.f", ": OOPS 1 0 / ;\n: OUTER OOPS ;\nOUTER")
        .unwrap_err();

    let location = error.location().clone().unwrap();

    assert_eq!(location.path(), "calc.f");
    assert_eq!(location.line(), 1);

    let names: Vec<String> = error
        .call_stack()
        .clone()
        .unwrap()
        .iter()
        .map(|item| item.word().clone())
        .collect();

    assert_eq!(names, vec!["OUTER".to_string(), "OOPS".to_string(), "/".to_string()]);
    assert!(error.to_string().starts_with("calc.f (1, 12): Division by zero"));
}
