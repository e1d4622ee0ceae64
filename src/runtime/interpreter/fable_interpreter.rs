use std::{ collections::VecDeque,
           rc::Rc,
           sync::{ Arc,
                   atomic::{ AtomicBool,
                             Ordering } } };
use crate::{ lang::{ code::{ ByteCode,
                             LoopDirection,
                             LoopKind,
                             Op },
                     compilation::{ CodeConstructor,
                                    Construction },
                     source_buffer::SourceLocation,
                     tokenizing::{ NumberType,
                                   StringForm,
                                   Token } },
             runtime::{ built_ins::register_builtin_words,
                        data_structures::{ cell_store::CellStore,
                                           dictionary::{ Dictionary,
                                                         WordBody,
                                                         WordHandler,
                                                         WordInfo,
                                                         WordRuntime,
                                                         WordSource },
                                           return_stack::{ CallFrame,
                                                           LoopFrame,
                                                           ReturnItem,
                                                           ReturnStack },
                                           value::{ ToValue,
                                                    Value } },
                        error::{ self,
                                 script_error,
                                 ErrorKind,
                                 ScriptError },
                        interpreter::{ type_mismatch,
                                       CallItem,
                                       CallStack,
                                       CodeManagement,
                                       EngineConfig,
                                       ExecutionMode,
                                       Interpreter,
                                       InterpreterStack,
                                       ValueStack,
                                       WordManagement,
                                       events::{ EventQueue,
                                                 EventSink } } } };



/// The diagnostic path used for source handed to `evaluate`.
pub const INPUT_PATH: &str = "<input>";



/// One interpreter session: the stacks, the dictionary and cell memory, and whatever evaluation
/// is currently in flight.
///
/// The engine is a state machine.  Each step either runs one instruction of the executing word or
/// handles one token of the pending source, so an evaluation can be suspended between any two
/// operations and picked up again by `step`.  Compiled words never recurse on the Rust stack, the
/// caller's frame is parked on the return stack instead.
pub struct FableInterpreter
{
    /// The settings the session was created with.
    config: EngineConfig,

    /// How evaluations are driven.
    mode: ExecutionMode,


    /// The data stack used by the interpreter.
    stack: ValueStack,

    /// Call markers, loop frames and `>R` values.
    return_stack: ReturnStack,


    /// The last known location execution has reached in the original source code.
    current_location: Option<SourceLocation>,

    /// The native word that's running, if any.
    current_word: Option<String>,

    /// The call stack used to keep track of the current execution context.
    call_stack: CallStack,


    /// The dictionary of words known by the interpreter.
    dictionary: Dictionary,

    /// Memory for variables.
    cells: CellStore,

    /// Dictionary and cell marks that `reset` returns to.
    session_mark: usize,
    cell_mark: usize,


    /// Source waiting to be processed, the front one is being worked on.
    contexts: VecDeque<CodeConstructor>,

    /// The compiled word currently executing.
    frame: Option<CallFrame>,


    /// Everything printed since the last `take_output`.
    output: String,

    /// Optional observer of the evaluation.
    sink: Option<Box<dyn EventSink>>,

    /// Set from anywhere to stop the running evaluation before its next operation.
    cancelled: Arc<AtomicBool>
}


impl Interpreter for FableInterpreter
{
    fn reset_definitions(&mut self)
    {
        log::debug!("Resetting session back to dictionary mark {}.", self.session_mark);

        self.stack.clear();
        self.dictionary.forget_back_to(self.session_mark);
        self.cells.truncate(self.cell_mark);
    }

    fn reset(&mut self)
    {
        self.return_stack.clear();
        self.call_stack.clear();
        self.contexts.clear();
        self.frame = None;
        self.current_word = None;

        self.reset_definitions();
    }
}


impl InterpreterStack for FableInterpreter
{
    fn stack(&self) -> &ValueStack
    {
        &self.stack
    }

    fn stack_mut(&mut self) -> &mut ValueStack
    {
        &mut self.stack
    }

    fn push(&mut self, value: Value)
    {
        self.stack.push(value);
    }

    fn require(&self, needed: usize) -> error::Result<()>
    {
        if self.stack.len() < needed
        {
            return script_error(self,
                                ErrorKind::StackUnderflow { word: self.current_word().to_string(),
                                                            needed,
                                                            available: self.stack.len() });
        }

        Ok(())
    }

    fn pop(&mut self) -> error::Result<Value>
    {
        self.require(1)?;

        match self.stack.pop()
        {
            Some(value) => Ok(value),
            None => unreachable!("stack emptied after the depth check")
        }
    }

    fn pop_as_int(&mut self) -> error::Result<i64>
    {
        let value = self.pop()?;

        match value.as_int()
        {
            Some(int) => Ok(int),
            None => type_mismatch(self, "integer", &value)
        }
    }

    fn pop_as_number(&mut self) -> error::Result<NumberType>
    {
        let value = self.pop()?;

        match value.as_number()
        {
            Some(number) => Ok(number),
            None => type_mismatch(self, "number", &value)
        }
    }

    fn pop_as_bool(&mut self) -> error::Result<bool>
    {
        let value = self.pop()?;

        match value.as_flag()
        {
            Some(flag) => Ok(flag),
            None => type_mismatch(self, "flag", &value)
        }
    }

    fn pop_as_string(&mut self) -> error::Result<String>
    {
        match self.pop()?
        {
            Value::String(text) => Ok(text),
            other => type_mismatch(self, "string", &other)
        }
    }

    fn pop_as_address(&mut self) -> error::Result<usize>
    {
        match self.pop()?
        {
            Value::Address(address) => Ok(address),
            Value::Int(address) if address >= 0 => Ok(address as usize),
            Value::Int(address) =>
                script_error(self, ErrorKind::InvalidAddress { word: self.current_word().to_string(),
                                                               address }),
            other => type_mismatch(self, "address", &other)
        }
    }

    fn return_stack(&self) -> &ReturnStack
    {
        &self.return_stack
    }

    fn return_stack_mut(&mut self) -> &mut ReturnStack
    {
        &mut self.return_stack
    }

    fn return_push(&mut self, item: ReturnItem) -> error::Result<()>
    {
        if !self.return_stack.push(item)
        {
            return script_error(self,
                                ErrorKind::ReturnStackOverflow { depth: self.return_stack
                                                                            .max_depth() });
        }

        Ok(())
    }
}


/// Build an error at the given location without going through the interpreter, for the places
/// where the interpreter is already borrowed.
fn error_at(location: &Option<SourceLocation>,
            call_stack: &CallStack,
            kind: ErrorKind) -> ScriptError
{
    ScriptError::new(location.clone(), kind, Some(call_stack.clone()))
}


impl CodeManagement for FableInterpreter
{
    fn next_token(&mut self) -> Option<Token>
    {
        self.contexts.front_mut()?.next_token()
    }

    fn next_token_name(&mut self) -> error::Result<( SourceLocation, String )>
    {
        let name = self.next_token()
                       .and_then(|token| token.name_text()
                                              .map(|name| ( token.location().clone(), name )));

        match name
        {
            Some(found) => Ok(found),
            None => script_error(self, ErrorKind::MissingName { word: self.current_word()
                                                                          .to_string() })
        }
    }

    fn is_compiling(&self) -> bool
    {
        self.contexts
            .front()
            .map(|context| context.construction.is_some())
            .unwrap_or(false)
    }

    fn context(&self) -> error::Result<&CodeConstructor>
    {
        match self.contexts.front()
        {
            Some(context) => Ok(context),
            None => script_error(self, ErrorKind::CompileOnly { word: self.current_word()
                                                                          .to_string() })
        }
    }

    fn context_mut(&mut self) -> error::Result<&mut CodeConstructor>
    {
        let word = self.current_word().to_string();

        self.contexts
            .front_mut()
            .ok_or_else(|| error_at(&self.current_location,
                                    &self.call_stack,
                                    ErrorKind::CompileOnly { word }))
    }

    fn construction_mut(&mut self) -> error::Result<&mut Construction>
    {
        let word = self.current_word().to_string();

        self.contexts
            .front_mut()
            .and_then(|context| context.construction.as_mut())
            .ok_or_else(|| error_at(&self.current_location,
                                    &self.call_stack,
                                    ErrorKind::CompileOnly { word }))
    }
}


impl WordManagement for FableInterpreter
{
    fn current_location(&self) -> &Option<SourceLocation>
    {
        &self.current_location
    }

    fn current_word(&self) -> &str
    {
        match ( &self.current_word, &self.frame )
        {
            ( Some(word), _ ) => word.as_str(),
            ( None, Some(frame) ) => frame.name.as_str(),
            ( None, None ) => ""
        }
    }

    fn add_word(&mut self,
                file: &str,
                line: usize,
                column: usize,
                name: &str,
                handler: WordHandler,
                description: &str,
                signature: &str,
                runtime: WordRuntime,
                compile_only: bool) -> usize
    {
        let location = SourceLocation::new_from_info(file, line, column);
        let mut word_info = WordInfo::new(location, name, WordBody::Primitive(handler));

        word_info.description = description.to_string();
        word_info.signature = signature.to_string();
        word_info.runtime = runtime;
        word_info.compile_only = compile_only;

        self.dictionary.insert(word_info)
    }

    fn dictionary(&self) -> &Dictionary
    {
        &self.dictionary
    }

    fn dictionary_mut(&mut self) -> &mut Dictionary
    {
        &mut self.dictionary
    }

    fn cells(&self) -> &CellStore
    {
        &self.cells
    }

    fn cells_mut(&mut self) -> &mut CellStore
    {
        &mut self.cells
    }

    fn call_stack(&self) -> &CallStack
    {
        &self.call_stack
    }

    fn output(&mut self, text: &str)
    {
        self.output.push_str(text);

        if let Some(sink) = self.sink.as_mut()
        {
            sink.output(text);
        }
    }
}


/// Put the bounds of a DO loop in the order its direction needs, so `0 10 DO ... 2 +LOOP` counts
/// up from 0 just like `10 0 DO ... 2 +LOOP` does.  A step computed at runtime counts up, only a
/// negative literal step counts down.
fn normalize_bounds(direction: LoopDirection, start: i64, limit: i64) -> ( i64, i64 )
{
    match direction
    {
        LoopDirection::Descending if start < limit => ( limit, start ),
        LoopDirection::Descending => ( start, limit ),
        LoopDirection::Ascending | LoopDirection::Unknown if start > limit => ( limit, start ),
        LoopDirection::Ascending | LoopDirection::Unknown => ( start, limit )
    }
}


/// The session API used by embedders.
impl FableInterpreter
{
    /// Create a session with the default configuration and all of the built-in words.
    pub fn new() -> FableInterpreter
    {
        FableInterpreter::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> FableInterpreter
    {
        let mut interpreter = FableInterpreter
            {
                mode: config.execution_mode,

                stack: Vec::with_capacity(20),
                return_stack: ReturnStack::new(config.max_return_depth),

                current_location: None,
                current_word: None,
                call_stack: CallStack::with_capacity(40),

                dictionary: Dictionary::new(),
                cells: CellStore::new(config.max_cells),

                session_mark: 0,
                cell_mark: 0,

                contexts: VecDeque::new(),
                frame: None,

                output: String::new(),
                sink: None,
                cancelled: Arc::new(AtomicBool::new(false)),

                config
            };

        register_builtin_words(&mut interpreter);
        interpreter.mark_session();

        interpreter
    }

    /// The configuration the session was created with.
    pub fn config(&self) -> &EngineConfig
    {
        &self.config
    }

    /// Remember the current dictionary and memory as the state `reset` goes back to.  Call this
    /// after loading any libraries that should survive a reset.
    pub fn mark_session(&mut self)
    {
        self.session_mark = self.dictionary.mark();
        self.cell_mark = self.cells.here();
    }

    /// Evaluate source code entered by the user.
    pub fn evaluate(&mut self, source: &str) -> error::Result<()>
    {
        self.process_source(INPUT_PATH, source)
    }

    /// Evaluate source code, using `path` to identify it in errors.  In step mode the source is
    /// queued behind anything still pending and nothing runs until `step` is called.
    pub fn process_source(&mut self, path: &str, source: &str) -> error::Result<()>
    {
        self.contexts.push_back(CodeConstructor::new(path, source));

        match self.mode
        {
            ExecutionMode::Step => self.checked(|interpreter| interpreter.retire_finished_contexts()),
            ExecutionMode::Run | ExecutionMode::Synchronized => self.run_pending()
        }
    }

    /// Run a single operation of the pending evaluation.  Returns true if more remain.
    pub fn step(&mut self) -> error::Result<bool>
    {
        if !self.has_pending()
        {
            return Ok(false);
        }

        self.checked(|interpreter| interpreter.step_once())?;

        Ok(self.has_pending())
    }

    /// Is there an evaluation in flight?
    pub fn has_pending(&self) -> bool
    {
        self.frame.is_some() || !self.contexts.is_empty()
    }

    pub fn execution_mode(&self) -> ExecutionMode
    {
        self.mode
    }

    /// Switch modes.  Anything pending is left pending, the next `evaluate` or `step` carries it
    /// on in the new mode.
    pub fn set_execution_mode(&mut self, mode: ExecutionMode)
    {
        self.mode = mode;
    }

    /// A handle that stops the running evaluation when set.  It's checked before every operation.
    pub fn cancellation_flag(&self) -> Arc<AtomicBool>
    {
        self.cancelled.clone()
    }

    /// Take everything printed so far.
    pub fn take_output(&mut self) -> String
    {
        std::mem::take(&mut self.output)
    }

    pub fn set_event_sink(&mut self, sink: Box<dyn EventSink>)
    {
        self.sink = Some(sink);
    }

    pub fn clear_event_sink(&mut self) -> Option<Box<dyn EventSink>>
    {
        self.sink.take()
    }

    /// Attach a new bounded event queue as the event sink and return the handle to poll it with.
    pub fn event_queue(&mut self) -> EventQueue
    {
        let queue = EventQueue::new(self.config.event_capacity);

        self.sink = Some(Box::new(queue.clone()));
        queue
    }

    /// Show a word's definition, the way SEE prints it.
    pub fn describe_word(&self, name: &str) -> Option<String>
    {
        self.dictionary
            .try_get(name)
            .map(|entry| entry.describe(&self.dictionary))
    }

    /// Source text that recreates every word defined since the session mark, in definition
    /// order.  Variables are followed by a store of their current value.
    pub fn session_source(&self) -> String
    {
        let mut source = String::new();

        for entry in self.dictionary.visible_since(self.session_mark)
        {
            match &entry.source
            {
                Some(WordSource::Colon(body)) =>
                    {
                        source.push_str(&format!(": {} {} ;", entry.name, body));

                        if entry.is_immediate()
                        {
                            source.push_str(" IMMEDIATE");
                        }
                    },

                Some(WordSource::Constant(value)) =>
                    source.push_str(&format!("{} CONSTANT {}", value.to_source(), entry.name)),

                Some(WordSource::Variable(address)) =>
                    {
                        source.push_str(&format!("VARIABLE {}", entry.name));

                        if let Some(value) = self.cells.fetch(*address)
                        {
                            source.push_str(&format!(" {} {} !", value.to_source(), entry.name));
                        }
                    },

                None => continue
            }

            source.push('\n');
        }

        source
    }
}


impl Default for FableInterpreter
{
    fn default() -> Self
    {
        Self::new()
    }
}


/// The outer and inner interpreter.
impl FableInterpreter
{
    /// Run an operation, and if it fails put the session back into a usable state before passing
    /// the error on.
    fn checked<T>(&mut self,
                  operation: impl FnOnce(&mut FableInterpreter) -> error::Result<T>)
                  -> error::Result<T>
    {
        let result = operation(self);

        if let Err(error) = &result
        {
            self.abort(error);
        }

        result
    }

    fn run_pending(&mut self) -> error::Result<()>
    {
        while self.has_pending()
        {
            self.checked(|interpreter| interpreter.step_once())?;
        }

        Ok(())
    }

    /// Drop the evaluation in flight after an error.  Definitions that were left open are removed
    /// along with their reserved dictionary entries.  The data stack is left as it was.
    fn abort(&mut self, error: &ScriptError)
    {
        log::debug!("Aborting evaluation: {}", error.kind());

        let open_definition = self.contexts
                                  .iter()
                                  .filter_map(|context| context.construction
                                                               .as_ref()
                                                               .map(|construction| construction.word))
                                  .min();

        if let Some(mark) = open_definition
        {
            self.dictionary.forget_back_to(mark);
        }

        self.contexts.clear();
        self.frame = None;
        self.return_stack.clear();
        self.call_stack.clear();
        self.current_word = None;

        if *error.kind() == ErrorKind::Cancelled
        {
            self.cancelled.store(false, Ordering::SeqCst);
        }

        if let Some(sink) = self.sink.as_mut()
        {
            sink.error_occurred(error);
        }
    }

    /// Do one unit of work: an instruction of the executing word, or one token of source.
    fn step_once(&mut self) -> error::Result<()>
    {
        if self.cancelled.load(Ordering::SeqCst)
        {
            return script_error(self, ErrorKind::Cancelled);
        }

        if self.frame.is_some()
        {
            self.execute_instruction()?;
        }
        else if let Some(token) = self.next_token()
        {
            self.process_token(token)?;
        }

        self.retire_finished_contexts()
    }

    /// Pop every fully consumed source off the front of the queue.  A source that ends in the
    /// middle of a definition is an error.
    fn retire_finished_contexts(&mut self) -> error::Result<()>
    {
        while self.frame.is_none()
        {
            let Some(context) = self.contexts.front_mut()
            else
            {
                break;
            };

            if !context.is_exhausted()
            {
                break;
            }

            if let Err(kind) = context.check_closed()
            {
                self.current_location = context.construction
                                               .as_ref()
                                               .map(|construction| construction.location.clone());

                return script_error(self, kind);
            }

            let _ = self.contexts.pop_front();
        }

        Ok(())
    }

    /// Tokens compiled into a definition are recorded as written, leaving out the `:` that opens
    /// it and the `;` that closes it.
    fn process_token(&mut self, token: Token) -> error::Result<()>
    {
        let written = if self.is_compiling() { Some(token.to_string()) } else { None };

        self.dispatch_token(token)?;

        if let Some(text) = written
           && let Some(construction) = self.contexts
                                           .front_mut()
                                           .and_then(|context| context.construction.as_mut())
        {
            construction.record(text);
        }

        Ok(())
    }

    fn dispatch_token(&mut self, token: Token) -> error::Result<()>
    {
        self.current_location = Some(token.location().clone());

        match token
        {
            Token::Number(location, number) =>
                {
                    let value = number.to_value();

                    if self.is_compiling()
                    {
                        self.insert_user_instruction(Some(location), Op::PushLiteral(value))
                    }
                    else
                    {
                        self.push(value);
                        Ok(())
                    }
                },

            Token::String(location, form, text) => self.process_string(location, form, text),

            Token::Word(location, name) => self.process_word(location, &name)
        }
    }

    fn process_string(&mut self,
                      location: SourceLocation,
                      form: StringForm,
                      text: String) -> error::Result<()>
    {
        let length = Value::Int(text.chars().count() as i64);

        match form
        {
            StringForm::Display =>
                {
                    self.output(&text);
                    Ok(())
                },

            StringForm::Print if self.is_compiling() =>
                {
                    let Some(( type_index, _ )) = self.dictionary.find("TYPE")
                    else
                    {
                        return script_error(self, ErrorKind::UnknownWord { name: "TYPE".to_string(),
                                                                           suggestions: Vec::new() });
                    };

                    self.insert_user_instruction(Some(location.clone()),
                                                 Op::PushLiteral(Value::String(text)))?;
                    self.insert_user_instruction(Some(location.clone()), Op::PushLiteral(length))?;
                    self.insert_user_instruction(Some(location), Op::CallPrimitive(type_index))
                },

            StringForm::Print =>
                {
                    self.output(&text);
                    Ok(())
                },

            StringForm::Push if self.is_compiling() =>
                {
                    self.insert_user_instruction(Some(location.clone()),
                                                 Op::PushLiteral(Value::String(text)))?;
                    self.insert_user_instruction(Some(location), Op::PushLiteral(length))
                },

            StringForm::Push =>
                {
                    self.push(Value::String(text));
                    self.push(length);
                    Ok(())
                }
        }
    }

    /// Resolve a word and either run it or compile a call to it.
    fn process_word(&mut self, location: SourceLocation, name: &str) -> error::Result<()>
    {
        let Some(( index, entry )) = self.dictionary.find(name)
        else
        {
            let suggestions = self.dictionary.suggest_similar(name);

            return script_error(self, ErrorKind::UnknownWord { name: name.to_string(),
                                                               suggestions });
        };

        let compiling = self.is_compiling();

        if entry.compile_only && !compiling
        {
            let word = entry.name.clone();

            return script_error(self, ErrorKind::CompileOnly { word });
        }

        if compiling && !entry.is_immediate()
        {
            let op = if entry.is_primitive() { Op::CallPrimitive(index) } else { Op::CallWord(index) };

            return self.insert_user_instruction(Some(location), op);
        }

        self.execute_word_index(index)
    }

    /// Start a word by dictionary index.  Native words run to completion right away, compiled
    /// words get a new frame that the following steps work through.
    fn execute_word_index(&mut self, index: usize) -> error::Result<()>
    {
        let Some(entry) = self.dictionary.entry(index)
        else
        {
            return script_error(self, ErrorKind::UnknownWord { name: format!("#{}", index),
                                                               suggestions: Vec::new() });
        };

        let name = entry.name.clone();
        let body = entry.body.clone();

        if let Some(sink) = self.sink.as_mut()
        {
            sink.word_starting(&name, &entry.signature);
        }

        match body
        {
            WordBody::Primitive(handler) => self.call_primitive(name, handler),
            WordBody::Compiled(code) => self.call_compiled(index, name, code)
        }
    }

    fn call_primitive(&mut self, name: String, handler: WordHandler) -> error::Result<()>
    {
        let location = self.current_location.clone().unwrap_or_default();

        self.call_stack.push(CallItem::new(name.clone(), location));
        self.current_word = Some(name);

        handler(self)?;

        let _ = self.call_stack.pop();

        if let Some(name) = self.current_word.take()
        {
            self.word_finished(&name);
        }

        Ok(())
    }

    fn call_compiled(&mut self, index: usize, name: String, code: Rc<ByteCode>) -> error::Result<()>
    {
        let caller = self.frame.take();
        let location = self.current_location.clone().unwrap_or_default();

        self.return_push(ReturnItem::Call(caller))?;
        self.call_stack.push(CallItem::new(name.clone(), location));
        self.frame = Some(CallFrame::new(index, &name, code));

        Ok(())
    }

    /// Leave the executing word, dropping whatever it left on the return stack, and resume its
    /// caller.
    fn exit_word(&mut self)
    {
        let Some(frame) = self.frame.take()
        else
        {
            return;
        };

        let caller = self.return_stack
                         .exit_call()
                         .unwrap_or_else(|| panic!("Return stack lost the call marker of {}.",
                                                   frame.name));

        self.frame = caller;
        let _ = self.call_stack.pop();

        self.word_finished(&frame.name);
    }

    fn word_finished(&mut self, name: &str)
    {
        if let Some(sink) = self.sink.as_mut()
        {
            sink.word_complete(name, &self.stack);

            if self.mode == ExecutionMode::Synchronized
            {
                sink.acknowledge(name);
            }
        }
    }

    fn jump(&mut self, target: usize)
    {
        if let Some(frame) = self.frame.as_mut()
        {
            assert!(target < frame.code.len(),
                    "Branch target {} is outside of the body of {}.",
                    target,
                    frame.name);

            frame.ip = target;
        }
    }

    /// Run the next instruction of the executing word.
    fn execute_instruction(&mut self) -> error::Result<()>
    {
        let Some(frame) = self.frame.as_mut()
        else
        {
            return Ok(());
        };

        let code = frame.code.clone();
        let ip = frame.ip;
        let word = frame.word;

        frame.ip += 1;

        let Some(instruction) = code.get(ip)
        else
        {
            panic!("Instruction pointer {} ran off the end of {}.", ip, frame.name);
        };

        if let Some(location) = &instruction.location
        {
            self.current_location = Some(location.clone());
        }

        log::trace!("{:4}: {}", ip, instruction);

        match &instruction.op
        {
            Op::CallPrimitive(index) | Op::CallWord(index) => self.execute_word_index(*index),

            Op::PushLiteral(value) =>
                {
                    self.push(value.clone());
                    Ok(())
                },

            Op::Branch(target) =>
                {
                    self.jump(*target);
                    Ok(())
                },

            Op::BranchIfFalse(target) =>
                {
                    if !self.pop_as_bool()?
                    {
                        self.jump(*target);
                    }

                    Ok(())
                },

            Op::LoopMarker(kind, target) => self.loop_marker(*kind, *target),

            Op::PushLoopIndex(depth) =>
                {
                    match self.return_stack.loop_frame(*depth).map(|frame| frame.index)
                    {
                        Some(index) =>
                            {
                                self.push(Value::Int(index));
                                Ok(())
                            },

                        None =>
                            {
                                let word = if *depth == 0 { "I" } else { "J" };
                                self.loop_mismatch(word)
                            }
                    }
                },

            Op::Exit =>
                {
                    self.exit_word();
                    Ok(())
                },

            Op::Recurse => self.execute_word_index(word)
        }
    }

    fn loop_mismatch<T>(&self, word: &str) -> error::Result<T>
    {
        script_error(self, ErrorKind::ControlStructureMismatch { opener: word.to_string(),
                                                                 expected: "DO".to_string() })
    }

    fn loop_marker(&mut self, kind: LoopKind, target: usize) -> error::Result<()>
    {
        match kind
        {
            LoopKind::Do(direction) | LoopKind::QueryDo(direction) =>
                {
                    self.require(2)?;

                    let start = self.pop_as_int()?;
                    let limit = self.pop_as_int()?;
                    let ( start, limit ) = normalize_bounds(direction, start, limit);

                    if matches!(kind, LoopKind::QueryDo(_)) && start == limit
                    {
                        self.jump(target);
                        return Ok(());
                    }

                    self.return_push(ReturnItem::Loop(LoopFrame { index: start, limit }))
                },

            LoopKind::Loop => self.advance_loop(1, target),

            LoopKind::PlusLoop =>
                {
                    let step = self.pop_as_int()?;
                    self.advance_loop(step, target)
                },

            LoopKind::Leave =>
                {
                    if self.return_stack.pop_loop().is_none()
                    {
                        return self.loop_mismatch("LEAVE");
                    }

                    self.jump(target);
                    Ok(())
                },

            LoopKind::Unloop =>
                {
                    match self.return_stack.pop_loop()
                    {
                        Some(_) => Ok(()),
                        None => self.loop_mismatch("UNLOOP")
                    }
                }
        }
    }

    /// Step the innermost loop.  Ascending steps carry on while the index is below the limit,
    /// negative steps while it's above.
    fn advance_loop(&mut self, step: i64, target: usize) -> error::Result<()>
    {
        let continues = match self.return_stack.innermost_loop_mut()
            {
                Some(frame) =>
                    {
                        frame.index = frame.index.saturating_add(step);

                        if step >= 0 { frame.index < frame.limit } else { frame.index > frame.limit }
                    },

                None => return self.loop_mismatch("LOOP")
            };

        if continues
        {
            self.jump(target);
        }
        else
        {
            let _ = self.return_stack.pop_loop();
        }

        Ok(())
    }
}
