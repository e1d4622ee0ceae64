use crate::{lang::code::ByteCode, runtime::data_structures::value::Value};
use std::rc::Rc;

/// The execution state of one compiled word: which word it is, its body and where in that body
/// we are.
#[derive(Clone, Debug)]
pub struct CallFrame {
    /// Dictionary index of the word, used by RECURSE.
    pub word: usize,

    /// The word's name, for events and error call stacks.
    pub name: String,

    /// The body being executed.  Shared with the dictionary entry, so forgetting or redefining the
    /// word doesn't pull the code out from under a running frame.
    pub code: Rc<ByteCode>,

    /// Index of the next instruction to execute.
    pub ip: usize,
}

impl CallFrame {
    pub fn new(word: usize, name: &str, code: Rc<ByteCode>) -> CallFrame {
        CallFrame {
            word,
            name: name.to_string(),
            code,
            ip: 0,
        }
    }
}

/// A DO loop's current index and limit.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct LoopFrame {
    pub index: i64,
    pub limit: i64,
}

/// Everything that can live on the return stack.
#[derive(Clone, Debug)]
pub enum ReturnItem {
    /// A value moved over by `>R`.
    Value(Value),

    /// The bookkeeping of an active DO loop.
    Loop(LoopFrame),

    /// Pushed when a compiled word is called.  Holds the caller's suspended frame, or nothing if
    /// the word was called straight from the outer interpreter.
    Call(Option<CallFrame>),
}

/// The return stack.  Loop frames and `>R` values sit above the call marker of the word that
/// created them, and no operation reaches below the nearest call marker except `exit_call`.
pub struct ReturnStack {
    items: Vec<ReturnItem>,
    max_depth: usize,
}

impl ReturnStack {
    pub fn new(max_depth: usize) -> ReturnStack {
        ReturnStack {
            items: Vec::new(),
            max_depth,
        }
    }

    pub fn depth(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Push an item.  Returns false and leaves the stack alone if it's already at its maximum
    /// depth.
    #[must_use]
    pub fn push(&mut self, item: ReturnItem) -> bool {
        if self.items.len() >= self.max_depth {
            return false;
        }

        self.items.push(item);
        true
    }

    /// Pop a `>R` value.  Fails without changing anything if the top item isn't a plain value.
    pub fn pop_value(&mut self) -> Option<Value> {
        match self.items.last() {
            Some(ReturnItem::Value(_)) => match self.items.pop() {
                Some(ReturnItem::Value(value)) => Some(value),
                _ => None,
            },
            _ => None,
        }
    }

    /// Look at the top `>R` value.
    pub fn peek_value(&self) -> Option<&Value> {
        match self.items.last() {
            Some(ReturnItem::Value(value)) => Some(value),
            _ => None,
        }
    }

    /// Position of the loop frame `depth` levels out from the innermost one, without looking past
    /// the current call.
    fn loop_position(&self, depth: usize) -> Option<usize> {
        self.items
            .iter()
            .enumerate()
            .rev()
            .take_while(|(_, item)| !matches!(item, ReturnItem::Call(_)))
            .filter(|(_, item)| matches!(item, ReturnItem::Loop(_)))
            .nth(depth)
            .map(|(position, _)| position)
    }

    /// The loop frame `depth` levels out, 0 for `I` and 1 for `J`.
    pub fn loop_frame(&self, depth: usize) -> Option<&LoopFrame> {
        match self.items.get(self.loop_position(depth)?) {
            Some(ReturnItem::Loop(frame)) => Some(frame),
            _ => None,
        }
    }

    /// The innermost loop frame, for LOOP and +LOOP to update.
    pub fn innermost_loop_mut(&mut self) -> Option<&mut LoopFrame> {
        let position = self.loop_position(0)?;

        match self.items.get_mut(position) {
            Some(ReturnItem::Loop(frame)) => Some(frame),
            _ => None,
        }
    }

    /// Remove the innermost loop frame of the current call.
    pub fn pop_loop(&mut self) -> Option<LoopFrame> {
        let position = self.loop_position(0)?;

        match self.items.remove(position) {
            ReturnItem::Loop(frame) => Some(frame),
            _ => None,
        }
    }

    /// Unwind everything the current call left on the stack, its own call marker included, and
    /// return the caller's frame.  The outer `None` means there was no call marker at all.
    pub fn exit_call(&mut self) -> Option<Option<CallFrame>> {
        while let Some(item) = self.items.pop() {
            if let ReturnItem::Call(caller) = item {
                return Some(caller);
            }
        }

        None
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(name: &str) -> CallFrame {
        CallFrame::new(0, name, Rc::new(ByteCode::new()))
    }

    #[test]
    fn values_do_not_cross_call_markers() {
        let mut stack = ReturnStack::new(16);

        assert!(stack.push(ReturnItem::Value(Value::Int(1))));
        assert!(stack.push(ReturnItem::Call(None)));

        assert!(stack.peek_value().is_none());
        assert!(stack.pop_value().is_none());
        assert_eq!(stack.depth(), 2);
    }

    #[test]
    fn loop_frames_are_found_through_values() {
        let mut stack = ReturnStack::new(16);

        assert!(stack.push(ReturnItem::Call(None)));
        assert!(stack.push(ReturnItem::Loop(LoopFrame { index: 0, limit: 3 })));
        assert!(stack.push(ReturnItem::Loop(LoopFrame { index: 5, limit: 9 })));
        assert!(stack.push(ReturnItem::Value(Value::Int(7))));

        assert_eq!(stack.loop_frame(0).map(|f| f.index), Some(5));
        assert_eq!(stack.loop_frame(1).map(|f| f.index), Some(0));
        assert!(stack.loop_frame(2).is_none());

        if let Some(frame) = stack.innermost_loop_mut() {
            frame.index += 1;
        }

        assert_eq!(stack.pop_loop(), Some(LoopFrame { index: 6, limit: 9 }));
        assert_eq!(stack.pop_value(), Some(Value::Int(7)));
    }

    #[test]
    fn loops_of_the_caller_are_invisible() {
        let mut stack = ReturnStack::new(16);

        assert!(stack.push(ReturnItem::Loop(LoopFrame { index: 0, limit: 3 })));
        assert!(stack.push(ReturnItem::Call(Some(frame("OUTER")))));

        assert!(stack.loop_frame(0).is_none());
        assert!(stack.pop_loop().is_none());
    }

    #[test]
    fn exit_unwinds_to_the_call_marker() {
        let mut stack = ReturnStack::new(16);

        assert!(stack.push(ReturnItem::Call(Some(frame("CALLER")))));
        assert!(stack.push(ReturnItem::Loop(LoopFrame { index: 0, limit: 3 })));
        assert!(stack.push(ReturnItem::Value(Value::Int(1))));

        let caller = stack.exit_call();

        assert_eq!(caller.flatten().map(|f| f.name), Some("CALLER".to_string()));
        assert!(stack.is_empty());
        assert!(stack.exit_call().is_none());
    }

    #[test]
    fn depth_is_bounded() {
        let mut stack = ReturnStack::new(1);

        assert!(stack.push(ReturnItem::Call(None)));
        assert!(!stack.push(ReturnItem::Call(None)));
        assert_eq!(stack.depth(), 1);
    }
}
