use std::{ collections::HashSet,
           fs::{ canonicalize, read_to_string, write },
           path::{ Path, PathBuf } };
use crate::runtime::{ error::{ self, ErrorKind, ScriptError },
                      interpreter::fable_interpreter::FableInterpreter };



/// Finds and loads library source files for an interpreter.  The engine itself never touches the
/// file system, this is the piece an embedder uses to feed it files.
#[derive(Default)]
pub struct LibraryLoader
{
    /// Directories searched in order for files given by relative name.
    search_paths: Vec<PathBuf>,

    /// Canonical paths of every file loaded so far.
    loaded: HashSet<PathBuf>
}


impl LibraryLoader
{
    pub fn new() -> LibraryLoader
    {
        LibraryLoader::default()
    }

    /// Add a directory to the end of the search order.  The directory has to exist.
    pub fn add_search_path(&mut self, path: impl AsRef<Path>) -> error::Result<()>
    {
        let path = path.as_ref();

        if !path.is_dir()
        {
            return ScriptError::new_as_result(None,
                                              ErrorKind::Io { message: format!("Search path {} \
                                                                                is not a directory.",
                                                                               path.display()) },
                                              None);
        }

        log::debug!("Adding library search path {}.", path.display());

        self.search_paths.push(path.to_path_buf());
        Ok(())
    }

    pub fn search_paths(&self) -> &[PathBuf]
    {
        &self.search_paths
    }

    /// Resolve a file name to its canonical path.  A path that exists as given wins, otherwise
    /// the search directories are tried in order.
    pub fn resolve(&self, name: &str) -> error::Result<PathBuf>
    {
        let direct = Path::new(name);

        if direct.is_file()
        {
            return Ok(canonicalize(direct)?);
        }

        for directory in &self.search_paths
        {
            let full_path = directory.join(name);

            if full_path.is_file()
            {
                return Ok(canonicalize(full_path)?);
            }
        }

        ScriptError::new_as_result(None,
                                   ErrorKind::Io { message: format!("File {} not found.", name) },
                                   None)
    }

    /// Has the file already been loaded?
    pub fn is_loaded(&self, path: &Path) -> bool
    {
        self.loaded.contains(path)
    }

    /// Every file loaded so far, in no particular order.
    pub fn loaded(&self) -> impl Iterator<Item = &Path>
    {
        self.loaded.iter().map(PathBuf::as_path)
    }

    /// Find a file and evaluate it in the interpreter, using its path in error locations.
    pub fn load(&mut self, interpreter: &mut FableInterpreter, name: &str) -> error::Result<()>
    {
        let path = self.resolve(name)?;
        let source = read_to_string(&path)?;
        let path_text = path.to_string_lossy().to_string();

        log::debug!("Loading library {}.", path_text);

        let _ = self.loaded.insert(path);
        interpreter.process_source(&path_text, &source)
    }

    /// Like `load`, but a file that was loaded before is skipped.  Returns true if the file was
    /// loaded this time.
    pub fn load_once(&mut self,
                     interpreter: &mut FableInterpreter,
                     name: &str) -> error::Result<bool>
    {
        let path = self.resolve(name)?;

        if self.is_loaded(&path)
        {
            log::debug!("Library {} is already loaded.", path.display());
            return Ok(false);
        }

        self.load(interpreter, &path.to_string_lossy())?;
        Ok(true)
    }

    /// Write the words defined in the interpreter's session to a file that `load` can read back.
    /// Returns how many words were written.
    pub fn save(&self,
                interpreter: &FableInterpreter,
                path: impl AsRef<Path>) -> error::Result<usize>
    {
        let path = path.as_ref();
        let source = interpreter.session_source();
        let count = source.lines().count();

        log::debug!("Saving {} word(s) to {}.", count, path.display());

        write(path, format!("\\ Words saved from a fable session.\n\\ Load this file to define them \
                             again.\n\n{}",
                            source))?;
        Ok(count)
    }
}
