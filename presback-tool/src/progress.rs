use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use presback_lib::display::format_bar_desc;

/// Terminal display for a backup run.
///
/// The `MultiProgress` is the only state shared between workers; it owns the
/// terminal and serialises every redraw. Bars are created up front in job
/// order so the layout doesn't depend on which worker starts first:
///
/// ```text
/// Archiving                     : 1/3   (green, advanced on join)
/// Documents                     : 4/9   (cyan, one per job)
///   Invoices                    : 12/40 (yellow, transient per directory)
/// ```
pub struct Progress {
    multi: MultiProgress,
    main: ProgressBar,
    workers: Vec<ProgressBar>,
}

fn bar_style(colour: &str) -> ProgressStyle {
    let template = format!("{{msg}}: {{percent:>3}}%|{{bar:50.{colour}}}| {{pos}}/{{len}}");
    ProgressStyle::with_template(&template).unwrap_or_else(|_| ProgressStyle::default_bar())
}

impl Progress {
    pub fn new(jobs: usize, visible: bool) -> Self {
        let target = if visible {
            ProgressDrawTarget::stderr()
        } else {
            ProgressDrawTarget::hidden()
        };
        let multi = MultiProgress::with_draw_target(target);

        let main = multi.add(ProgressBar::new(jobs as u64));
        main.set_style(bar_style("green"));
        main.set_message(format_bar_desc("Archiving"));

        let workers = (0..jobs)
            .map(|_| {
                let bar = multi.add(ProgressBar::new(0));
                bar.set_style(bar_style("cyan"));
                bar.set_message(format_bar_desc("Pending..."));
                bar
            })
            .collect();

        Self {
            multi,
            main,
            workers,
        }
    }

    /// Handle for the worker running job `index`.
    pub fn worker(&self, index: usize) -> WorkerProgress {
        let bar = self
            .workers
            .get(index)
            .cloned()
            .unwrap_or_else(ProgressBar::hidden);
        WorkerProgress {
            multi: self.multi.clone(),
            bar,
        }
    }

    pub fn job_joined(&self) {
        self.main.inc(1);
    }

    pub fn finish(&self) {
        self.main.finish();
        for bar in &self.workers {
            if !bar.is_finished() {
                bar.finish();
            }
        }
    }
}

/// One worker's view of the display: its own directory bar plus the
/// transient file bars it creates beneath it.
#[derive(Clone)]
pub struct WorkerProgress {
    multi: MultiProgress,
    bar: ProgressBar,
}

impl WorkerProgress {
    pub fn start(&self, name: &str, directories: usize) {
        self.bar.set_message(format_bar_desc(name));
        self.bar.set_length(directories as u64);
        self.bar.set_position(0);
    }

    pub fn file_bar(&self, dir_name: &str, files: usize) -> FileProgress {
        let bar = self
            .multi
            .insert_after(&self.bar, ProgressBar::new(files as u64));
        bar.set_style(bar_style("yellow"));
        bar.set_message(format_bar_desc(dir_name));
        FileProgress {
            multi: self.multi.clone(),
            bar,
        }
    }

    pub fn directory_done(&self) {
        self.bar.inc(1);
    }

    pub fn finish(&self) {
        self.bar.finish();
    }

    /// Writes `msg` to stderr with the bars cleared, so the line isn't torn
    /// by another worker's redraw.
    pub fn eprintln(&self, msg: &str) {
        self.multi.suspend(|| eprintln!("{msg}"));
    }

    pub fn fail(&self, name: &str) {
        self.bar
            .abandon_with_message(format_bar_desc(&format!("{name} (failed)")));
    }
}

/// Per-directory file bar, removed from the display when dropped.
pub struct FileProgress {
    multi: MultiProgress,
    bar: ProgressBar,
}

impl FileProgress {
    pub fn file_done(&self) {
        self.bar.inc(1);
    }
}

impl Drop for FileProgress {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
        self.multi.remove(&self.bar);
    }
}
