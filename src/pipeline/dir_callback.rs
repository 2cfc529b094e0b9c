//! Per-folder traversal visitor: applies the filter, fills the folder tree and routes
//! errors and status through the [`AsyncCallback`].

use log::debug;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use super::async_callback::AsyncCallback;
use super::interrupt::InterruptionPoint;
use crate::afs::{
    AbstractPath, ErrorInfo, FileInfo, FolderInfo, HandleError, HandleLink, SymlinkInfo,
    TraverserCallback,
};
use crate::error::Interrupted;
use crate::filter::PathFilter;
use crate::types::{
    DirectoryKey, FileAttributes, FolderAttributes, FolderContainer, LinkAttributes,
    SymlinkHandling,
};
use crate::utils::config::TraversalConsts;

#[derive(Debug, Default)]
struct TraverserState {
    failed_folder_reads: BTreeMap<String, String>,
    failed_item_reads: BTreeMap<String, String>,
    last_report_time: Option<Instant>,
}

/// Shared by every [`DirCallback`] of one traversal request, borrowed down the tree.
#[derive(Debug)]
pub struct TraverserConfig<'a> {
    pub base_folder_path: &'a AbstractPath,
    pub filter: &'a PathFilter,
    pub handle_symlinks: SymlinkHandling,
    pub acb: &'a AsyncCallback,
    pub thread_idx: usize,
    pub interrupt: &'a InterruptionPoint,
    state: Mutex<TraverserState>,
}

/// Failed reads collected for one request: `(folders, items)`.
pub type FailedReads = (BTreeMap<String, String>, BTreeMap<String, String>);

impl<'a> TraverserConfig<'a> {
    pub fn new(
        key: &'a DirectoryKey,
        acb: &'a AsyncCallback,
        thread_idx: usize,
        interrupt: &'a InterruptionPoint,
    ) -> Self {
        Self {
            base_folder_path: &key.folder_path,
            filter: &key.filter,
            handle_symlinks: key.handle_symlinks,
            acb,
            thread_idx,
            interrupt,
            state: Mutex::new(TraverserState::default()),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, TraverserState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn into_failed_reads(self) -> FailedReads {
        let state = self.state.into_inner().unwrap_or_else(|e| e.into_inner());
        (state.failed_folder_reads, state.failed_item_reads)
    }
}

/// Visitor for one folder level; the child level borrows this one's output subtree.
pub struct DirCallback<'a> {
    cfg: &'a TraverserConfig<'a>,
    output: &'a mut FolderContainer,
    /// Relative path of this folder with a trailing `/`, empty at the base folder.
    parent_rel_path_pf: String,
    level: usize,
}

impl<'a> DirCallback<'a> {
    /// Visitor for the base folder of a request.
    pub fn new(cfg: &'a TraverserConfig<'a>, output: &'a mut FolderContainer) -> Self {
        Self {
            cfg,
            output,
            parent_rel_path_pf: String::new(),
            level: 0,
        }
    }

    fn rel_path(&self, item_name: &str) -> String {
        format!("{}{}", self.parent_rel_path_pf, item_name)
    }

    /// Rate-limited; only the designated reporter thread gets through.
    fn report_status(&self, rel_path: &str) {
        let may_report = {
            let mut state = self.cfg.lock_state();
            self.cfg
                .acb
                .may_report_current_file(self.cfg.thread_idx, &mut state.last_report_time)
        };
        if may_report {
            let display = self.cfg.base_folder_path.join(rel_path).display_path();
            self.cfg.acb.report_current_file(&display);
        }
    }

    fn report_endless_recursion(&mut self, item_name: &str) -> Result<(), Interrupted> {
        let msg = format!(
            "Cannot read directory '{}'. Endless recursion.",
            self.cfg
                .base_folder_path
                .join(&self.rel_path(item_name))
                .display_path()
        );
        let mut retry_number = 0;
        while self.report_item_error(
            &ErrorInfo {
                msg: msg.clone(),
                retry_number,
            },
            item_name,
        )? == HandleError::Retry
        {
            retry_number += 1;
        }
        Ok(())
    }
}

impl TraverserCallback for DirCallback<'_> {
    fn on_file(&mut self, file: &FileInfo) -> Result<(), Interrupted> {
        self.cfg.interrupt.check()?;
        let rel_path = self.rel_path(&file.item_name);
        self.report_status(&rel_path);

        if !self.cfg.filter.pass_file_filter(&rel_path) {
            return Ok(());
        }
        self.output.add_file(
            &file.item_name,
            FileAttributes {
                mod_time: file.mod_time,
                file_size: file.file_size,
                file_print: file.file_print,
                is_followed_symlink: file.is_followed_symlink,
            },
        );
        self.cfg.acb.inc_items_scanned();
        Ok(())
    }

    fn on_folder(
        &mut self,
        folder: &FolderInfo,
    ) -> Result<Option<Box<dyn TraverserCallback + '_>>, Interrupted> {
        self.cfg.interrupt.check()?;
        let rel_path = self.rel_path(&folder.item_name);
        self.report_status(&rel_path);

        let res = self.cfg.filter.pass_dir_filter(&rel_path);
        if !res.pass && !res.child_item_might_match {
            return Ok(None);
        }
        let attr = FolderAttributes {
            is_followed_symlink: folder.is_followed_symlink,
        };
        if res.pass {
            self.cfg.acb.inc_items_scanned();
        }

        if self.level > TraversalConsts::MAX_FOLDER_DEPTH {
            self.output.add_folder(&folder.item_name, attr);
            self.report_endless_recursion(&folder.item_name)?;
            return Ok(None);
        }

        // folders kept only for a possibly matching child are still represented
        let sub_folder = self.output.add_folder(&folder.item_name, attr);
        Ok(Some(Box::new(DirCallback {
            cfg: self.cfg,
            output: sub_folder,
            parent_rel_path_pf: rel_path + "/",
            level: self.level + 1,
        })))
    }

    fn on_symlink(&mut self, link: &SymlinkInfo) -> Result<HandleLink, Interrupted> {
        self.cfg.interrupt.check()?;
        let rel_path = self.rel_path(&link.item_name);
        self.report_status(&rel_path);

        match self.cfg.handle_symlinks {
            SymlinkHandling::Exclude => Ok(HandleLink::Skip),
            SymlinkHandling::Direct => {
                if self.cfg.filter.pass_file_filter(&rel_path) {
                    self.output.add_link(
                        &link.item_name,
                        LinkAttributes {
                            mod_time: link.mod_time,
                        },
                    );
                    self.cfg.acb.inc_items_scanned();
                }
                Ok(HandleLink::Skip)
            }
            SymlinkHandling::Follow => {
                // target type is unknown yet: skip only if both filter views reject it
                if !self.cfg.filter.pass_file_filter(&rel_path) {
                    let res = self.cfg.filter.pass_dir_filter(&rel_path);
                    if !res.pass && !res.child_item_might_match {
                        return Ok(HandleLink::Skip);
                    }
                }
                Ok(HandleLink::Follow)
            }
        }
    }

    fn report_dir_error(&mut self, err: &ErrorInfo) -> Result<HandleError, Interrupted> {
        let answer = self
            .cfg
            .acb
            .report_error(&err.msg, err.retry_number, self.cfg.interrupt)?;
        if answer == HandleError::Continue {
            let rel_path = self
                .parent_rel_path_pf
                .strip_suffix('/')
                .unwrap_or(&self.parent_rel_path_pf)
                .to_string();
            debug!("recording failed folder read '{rel_path}'");
            self.cfg
                .lock_state()
                .failed_folder_reads
                .insert(rel_path, err.msg.clone());
        }
        Ok(answer)
    }

    fn report_item_error(
        &mut self,
        err: &ErrorInfo,
        item_name: &str,
    ) -> Result<HandleError, Interrupted> {
        let answer = self
            .cfg
            .acb
            .report_error(&err.msg, err.retry_number, self.cfg.interrupt)?;
        if answer == HandleError::Continue {
            let rel_path = self.rel_path(item_name);
            debug!("recording failed item read '{rel_path}'");
            self.cfg
                .lock_state()
                .failed_item_reads
                .insert(rel_path, err.msg.clone());
        }
        Ok(answer)
    }
}
