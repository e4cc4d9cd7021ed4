//! Impls - ports の実装（開発用・テスト用）
//!
//! # 含まれる実装
//! - **InMemoryProjectStore**: 開発用・テスト用の正本
//! - **FileBuildOutputStore**: ビルドログのファイル保存
//!
//! 永続ストアの実装は別クレートに置く想定。

pub mod fs_output;
pub mod memory_store;

pub use self::fs_output::FileBuildOutputStore;
pub use self::memory_store::InMemoryProjectStore;
