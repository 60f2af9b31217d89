// SPDX-License-Identifier: Apache-2.0
// Copyright 2026 Joe Pearson
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::trace;

use crate::error::Error;

/// Exclusive use of a stage's output file.
///
/// Acquiring the file removes a stale copy of a previous run. The file must
/// exist when the stage [finishes](OutputFile::finish); a file left behind
/// by a stage that didn't finish is removed when the guard is dropped.
#[derive(Debug)]
pub(crate) struct OutputFile {
    path: PathBuf,
    finished: bool,
}

impl OutputFile {
    pub(crate) fn acquire(dir: &Path, name: &str) -> Result<Self, Error> {
        let path = dir.join(name);

        match fs::remove_file(&path) {
            Ok(()) => trace!("removed stale {}", path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(Error::io(&path, e)),
        }

        Ok(Self {
            path,
            finished: false,
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Releases the file after checking that the stage wrote it.
    pub(crate) fn finish(mut self) -> Result<PathBuf, Error> {
        if !self.path.is_file() {
            return Err(Error::MissingResource {
                path: self.path.clone(),
            });
        }

        self.finished = true;
        Ok(self.path.clone())
    }
}

impl Drop for OutputFile {
    fn drop(&mut self) {
        if !self.finished && self.path.exists() {
            trace!("removing unfinished {}", self.path.display());
            let _ = fs::remove_file(&self.path);
        }
    }
}
