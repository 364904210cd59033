use super::*;
use crate::manager::test_helpers::{
    FakeFetcher, RejectingStore, TEST_CDN, build_manager, create_test_manager,
    create_test_manager_with, regular_caller, test_config, wait_for_terminal,
};
use crate::types::{Caller, SongId, SourcePlatform, TaskId, TaskStatus};
