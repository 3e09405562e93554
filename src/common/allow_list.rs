//! 送信先の許可リスト

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use log::debug;

use crate::error::Error;

/// 送信を許可する宛先アドレスの集合
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    addresses: HashSet<String>,
}

impl AllowList {
    /// 空白区切りのテキストから許可リストを構築
    pub fn parse(text: &str) -> Self {
        text.split_whitespace().collect()
    }

    /// ファイルから許可リストを読み込む
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| Error::AllowListUnavailable(format!("{}: {}", path.display(), e)))?;
        let list = Self::parse(&text);
        debug!("Loaded {} allowed recipients from {}", list.len(), path.display());
        Ok(list)
    }

    /// アドレスが完全一致で許可されているか
    pub fn contains(&self, address: &str) -> bool {
        self.addresses.contains(address)
    }

    /// 許可されていない宛先は `RecipientNotAllowed`
    pub fn ensure_allowed(&self, address: &str) -> Result<(), Error> {
        if self.contains(address) {
            Ok(())
        } else {
            Err(Error::RecipientNotAllowed(address.to_string()))
        }
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

impl<'a> FromIterator<&'a str> for AllowList {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Self {
            addresses: iter.into_iter().map(str::to_string).collect(),
        }
    }
}
