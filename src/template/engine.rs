// ABOUTME: Substitution engine that runs the variable, include, and exec passes
// ABOUTME: Each pass lexes its input, resolves markers concurrently, then splices them back in order

use futures::future::{self, BoxFuture, FutureExt};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use super::error::{Result, TemplateError};
use super::host::{read_lossy, Host, SystemHost};
use super::marker::{self, MarkerKind};
use super::source::SourceLocation;

/// Options that change how documents are templated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateOptions {
    /// Emit a trace line before each resolution.
    pub debug: bool,
    /// Fail when a file includes one of its own ancestors.
    pub detect_include_cycles: bool,
}

impl Default for TemplateOptions {
    fn default() -> Self {
        Self {
            debug: false,
            detect_include_cycles: true,
        }
    }
}

impl TemplateOptions {
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

#[derive(Clone)]
pub struct TemplateEngine {
    host: Arc<dyn Host>,
    options: TemplateOptions,
}

impl TemplateEngine {
    /// Create an engine that talks to the real environment, filesystem, and shell
    pub fn new(options: TemplateOptions) -> Self {
        Self::with_host(Arc::new(SystemHost::new()), options)
    }

    /// Create an engine backed by a custom host
    pub fn with_host(host: Arc<dyn Host>, options: TemplateOptions) -> Self {
        Self { host, options }
    }

    pub fn options(&self) -> &TemplateOptions {
        &self.options
    }

    /// Resolve every marker in `content`, which was read from `source`.
    ///
    /// Variables are substituted first, then includes (each fully templated
    /// relative to its own directory), then command output. The trailing
    /// newline run of the result is collapsed to a single newline.
    pub async fn template(&self, content: &str, source: &SourceLocation) -> Result<String> {
        let mut chain = Vec::new();
        if self.options.detect_include_cycles {
            if let Some(path) = source.path() {
                chain.push(self.host.canonicalize(path).await);
            }
        }
        self.render(content, source, &chain).await
    }

    fn render<'a>(
        &'a self,
        content: &'a str,
        source: &'a SourceLocation,
        chain: &'a [PathBuf],
    ) -> BoxFuture<'a, Result<String>> {
        async move {
            let text = self
                .substitute(content, source, MarkerKind::Variable, |name| {
                    future::ready(Ok(self.resolve_variable(name, source)))
                })
                .await?;

            let text = self
                .substitute(&text, source, MarkerKind::Include, |path| {
                    self.resolve_include(path, source, chain)
                })
                .await?;

            let text = self
                .substitute(&text, source, MarkerKind::Exec, |command| {
                    self.resolve_exec(command, source)
                })
                .await?;

            Ok(marker::normalize_trailing_newlines(text))
        }
        .boxed()
    }

    /// Run one pass: discover all markers of `kind`, resolve them together,
    /// and reassemble in document order once every resolution has finished.
    async fn substitute<'t, F, Fut>(
        &self,
        input: &'t str,
        source: &SourceLocation,
        kind: MarkerKind,
        resolve: F,
    ) -> Result<String>
    where
        F: Fn(&'t str) -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        let segments = marker::lex(input, kind);

        if self.options.debug {
            for offset in marker::unmatched_openers(&segments, kind) {
                debug!(
                    "{}: unterminated {} marker left as text: {:?}",
                    source,
                    kind,
                    marker::snippet_at(input, offset)
                );
            }
        }

        let resolutions =
            future::try_join_all(marker::markers(&segments).map(|m| resolve(m.payload))).await?;

        Ok(marker::assemble(&segments, &resolutions))
    }

    fn resolve_variable(&self, name: &str, source: &SourceLocation) -> String {
        if self.options.debug {
            debug!("{}: evaluating {} for replacement...", source, name);
        }
        self.host.var(name).unwrap_or_default()
    }

    async fn resolve_include(
        &self,
        relative: &str,
        source: &SourceLocation,
        chain: &[PathBuf],
    ) -> Result<String> {
        let path = source.resolve(relative);

        let mut chain = chain.to_vec();
        if self.options.detect_include_cycles {
            let canonical = self.host.canonicalize(&path).await;
            let seen = chain.contains(&canonical);
            chain.push(canonical);
            if seen {
                return Err(TemplateError::IncludeCycle { chain });
            }
        }

        if self.options.debug {
            debug!(
                "{}: reading {} for replacement...",
                source,
                path.display()
            );
        }

        let content = self
            .host
            .read_file(&path)
            .await
            .map_err(|e| TemplateError::ReadError {
                path: path.clone(),
                source: e,
            })?;

        let included = SourceLocation::Path(path);
        self.render(&content, &included, &chain).await
    }

    async fn resolve_exec(&self, command: &str, source: &SourceLocation) -> Result<String> {
        let cwd = source.effective_dir();
        if self.options.debug {
            debug!("{}: executing {} for replacement...", source, command);
        }
        self.host.execute(command, &cwd).await
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new(TemplateOptions::default())
    }
}

/// Template `content` against the real host environment.
pub async fn template(
    content: &str,
    source: &SourceLocation,
    options: TemplateOptions,
) -> Result<String> {
    TemplateEngine::new(options).template(content, source).await
}

/// Read `path` and template it as its own source.
pub async fn template_file(path: &Path, options: TemplateOptions) -> Result<String> {
    let content = read_lossy(path)
        .await
        .map_err(|e| TemplateError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
    template(&content, &SourceLocation::from(path), options).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory host: commands echo back a canned answer and record their cwd.
    #[derive(Default)]
    struct MemoryHost {
        vars: HashMap<String, String>,
        files: HashMap<PathBuf, String>,
        commands: HashMap<String, String>,
        executed: Mutex<Vec<(String, PathBuf)>>,
    }

    impl MemoryHost {
        fn with_var(mut self, name: &str, value: &str) -> Self {
            self.vars.insert(name.to_string(), value.to_string());
            self
        }

        fn with_file(mut self, path: &str, content: &str) -> Self {
            self.files.insert(PathBuf::from(path), content.to_string());
            self
        }

        fn with_command(mut self, command: &str, output: &str) -> Self {
            self.commands
                .insert(command.to_string(), output.to_string());
            self
        }
    }

    #[async_trait]
    impl Host for MemoryHost {
        fn var(&self, name: &str) -> Option<String> {
            self.vars.get(name).cloned()
        }

        async fn read_file(&self, path: &Path) -> std::io::Result<String> {
            self.files.get(path).cloned().ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::NotFound, "no such file")
            })
        }

        async fn execute(&self, command: &str, cwd: &Path) -> Result<String> {
            self.executed
                .lock()
                .unwrap()
                .push((command.to_string(), cwd.to_path_buf()));
            self.commands
                .get(command)
                .cloned()
                .ok_or_else(|| TemplateError::CommandFailed {
                    command: command.to_string(),
                    status: "exit code 127".to_string(),
                    stderr: "not found".to_string(),
                })
        }
    }

    fn engine(host: MemoryHost) -> (TemplateEngine, Arc<MemoryHost>) {
        let host = Arc::new(host);
        let engine = TemplateEngine::with_host(host.clone(), TemplateOptions::default());
        (engine, host)
    }

    fn doc(path: &str) -> SourceLocation {
        SourceLocation::from_arg(path)
    }

    #[tokio::test]
    async fn test_plain_text_passes_through() {
        let (engine, _) = engine(MemoryHost::default());
        let result = engine
            .template("hello\nworld\n", &SourceLocation::Stdin)
            .await
            .unwrap();
        assert_eq!(result, "hello\nworld\n");
    }

    #[tokio::test]
    async fn test_variables_resolve_and_missing_is_empty() {
        let (engine, _) = engine(MemoryHost::default().with_var("NAME", "value"));

        let result = engine
            .template("n=${{NAME}} m=${{ NAME }} x=${{MISSING}}!", &SourceLocation::Stdin)
            .await
            .unwrap();
        assert_eq!(result, "n=value m=value x=!\n");

        let result = engine
            .template("a=${{FOO}}b", &SourceLocation::Stdin)
            .await
            .unwrap();
        assert_eq!(result, "a=b\n");
    }

    #[tokio::test]
    async fn test_include_is_templated_with_its_own_variables() {
        let host = MemoryHost::default()
            .with_var("BAR", "bar-value")
            .with_file("/a/b/frag.txt", "frag says ${{BAR}}\n\n");
        let (engine, _) = engine(host);

        let result = engine
            .template("before $<<frag.txt>> after", &doc("/a/b/doc.txt"))
            .await
            .unwrap();
        assert_eq!(result, "before frag says bar-value\n after\n");
    }

    #[tokio::test]
    async fn test_nested_includes_resolve_relative_to_their_own_file() {
        let host = MemoryHost::default()
            .with_file("/a/b/sub/inc.txt", "inc[$<<deep.txt>>]")
            .with_file("/a/b/sub/deep.txt", "deep")
            .with_file("/a/b/deep.txt", "WRONG");
        let (engine, _) = engine(host);

        let result = engine
            .template("$<<sub/inc.txt>>", &doc("/a/b/doc.txt"))
            .await
            .unwrap();
        assert_eq!(result, "inc[deep\n]\n");
    }

    #[tokio::test]
    async fn test_exec_uses_effective_directory() {
        let host = MemoryHost::default()
            .with_command("echo hi", "hi\n")
            .with_file("/a/b/sub/inc.txt", "$((echo hi))");
        let (engine, host) = engine(host);

        let result = engine
            .template("top=$((echo hi))inc=$<<sub/inc.txt>>", &doc("/a/b/doc.txt"))
            .await
            .unwrap();
        assert_eq!(result, "top=hi\ninc=hi\n");

        let executed = host.executed.lock().unwrap().clone();
        assert_eq!(executed.len(), 2);
        assert!(executed.contains(&("echo hi".to_string(), PathBuf::from("/a/b"))));
        assert!(executed.contains(&("echo hi".to_string(), PathBuf::from("/a/b/sub"))));
    }

    #[tokio::test]
    async fn test_stdin_uses_current_directory() {
        let (engine, host) = engine(MemoryHost::default().with_command("pwd", "."));

        engine
            .template("$((pwd))", &SourceLocation::Stdin)
            .await
            .unwrap();

        let executed = host.executed.lock().unwrap().clone();
        assert_eq!(executed, vec![("pwd".to_string(), PathBuf::from("."))]);
    }

    #[tokio::test]
    async fn test_variable_output_feeds_later_passes() {
        // The include path itself comes from a variable resolved in the first pass.
        let host = MemoryHost::default()
            .with_var("PART", "part.txt")
            .with_file("/d/part.txt", "included");
        let (engine, _) = engine(host);

        let result = engine
            .template("$<<${{PART}}>>", &doc("/d/doc.txt"))
            .await
            .unwrap();
        assert_eq!(result, "included\n");
    }

    #[tokio::test]
    async fn test_rooted_include_stays_under_document_directory() {
        let host = MemoryHost::default()
            .with_file("/a/b/etc/x", "under")
            .with_file("/etc/x", "outside")
            .with_file("/a/shared.txt", "shared");
        let (engine, _) = engine(host);

        let result = engine
            .template("$<</etc/x>> $<<../shared.txt>>", &doc("/a/b/doc.txt"))
            .await
            .unwrap();
        assert_eq!(result, "under\n shared\n");
    }

    #[tokio::test]
    async fn test_missing_include_fails() {
        let (engine, _) = engine(MemoryHost::default());
        let err = engine
            .template("x $<<nope.txt>>", &doc("/a/doc.txt"))
            .await
            .unwrap_err();

        match err {
            TemplateError::ReadError { path, .. } => {
                assert_eq!(path, PathBuf::from("/a/nope.txt"))
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_failing_command_in_nested_include_fails_whole_document() {
        let host = MemoryHost::default().with_file("/a/inc.txt", "$((exit 1))");
        let (engine, _) = engine(host);

        let err = engine
            .template("ok $<<inc.txt>>", &doc("/a/doc.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, TemplateError::CommandFailed { .. }));
    }

    #[tokio::test]
    async fn test_include_cycle_is_detected() {
        let host = MemoryHost::default()
            .with_file("/t/a.txt", "a $<<b.txt>>")
            .with_file("/t/b.txt", "b $<<a.txt>>");
        let (engine, _) = engine(host);

        let err = engine
            .template("a $<<b.txt>>", &doc("/t/a.txt"))
            .await
            .unwrap_err();

        match err {
            TemplateError::IncludeCycle { chain } => assert_eq!(
                chain,
                vec![
                    PathBuf::from("/t/a.txt"),
                    PathBuf::from("/t/b.txt"),
                    PathBuf::from("/t/a.txt"),
                ]
            ),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_repeated_and_diamond_includes_are_not_cycles() {
        let host = MemoryHost::default()
            .with_file("/t/left.txt", "L$<<shared.txt>>")
            .with_file("/t/right.txt", "R$<<shared.txt>>")
            .with_file("/t/shared.txt", "s");
        let (engine, _) = engine(host);

        let result = engine
            .template("$<<left.txt>>|$<<right.txt>>|$<<shared.txt>>", &doc("/t/doc.txt"))
            .await
            .unwrap();
        assert_eq!(result, "Ls\n|Rs\n|s\n");
    }

    #[tokio::test]
    async fn test_malformed_markers_are_left_verbatim() {
        let options = TemplateOptions::default().with_debug(true);
        let engine = TemplateEngine::with_host(Arc::new(MemoryHost::default()), options);

        let input = "keep ${{UNCLOSED and $<<nope and $((nope) done";
        let result = engine.template(input, &SourceLocation::Stdin).await.unwrap();
        assert_eq!(result, format!("{}\n", input));
    }

    #[tokio::test]
    async fn test_trailing_newlines_collapse() {
        let (engine, _) = engine(MemoryHost::default());
        let result = engine
            .template("body\n\n\n", &SourceLocation::Stdin)
            .await
            .unwrap();
        assert_eq!(result, "body\n");
    }
}
