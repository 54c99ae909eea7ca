//! 지갑 세션 컨텍스트.
//!
//! 지갑이 없으면 공개(영 주소) 계정 피드를, 지갑이 있으면 해당 주소의 계정 피드와
//! 과거 주문 피드를 기본으로 구독합니다. 두 구성은 동시에 활성화되지 않습니다.

use perp_core::Address;

use crate::channel::Channel;

/// 주소 변경 시 해제/구독할 기본 채널.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSwitch {
    pub removed: Vec<Channel>,
    pub added: Vec<Channel>,
}

impl SessionSwitch {
    /// 해제되는 채널과 같은 종류의 새 채널. 리스너를 옮길 대상입니다.
    pub fn successor(&self, removed: &Channel) -> Option<&Channel> {
        self.added
            .iter()
            .find(|c| std::mem::discriminant(*c) == std::mem::discriminant(removed))
    }
}

/// 현재 지갑 주소.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalletSession {
    address: Option<Address>,
}

impl WalletSession {
    pub fn new(address: Option<Address>) -> Self {
        Self {
            address: address.filter(|a| !a.is_public()),
        }
    }

    pub fn address(&self) -> Option<&Address> {
        self.address.as_ref()
    }

    /// 사용자 피드에 사용할 주소 (지갑이 없으면 영 주소).
    pub fn feed_user(&self) -> Address {
        self.address.clone().unwrap_or_else(Address::public)
    }

    /// 이 세션의 사용자 범위 기본 채널.
    pub fn default_channels(&self) -> Vec<Channel> {
        match &self.address {
            Some(user) => vec![
                Channel::account(user.clone()),
                Channel::historical_orders(user.clone()),
            ],
            None => vec![Channel::account(Address::public())],
        }
    }

    /// 주소를 교체합니다. 같은 주소면 `None`.
    pub fn switch(&mut self, address: Option<Address>) -> Option<SessionSwitch> {
        let next = WalletSession::new(address);
        if next == *self {
            return None;
        }

        let removed = self.default_channels();
        let added = next.default_channels();
        *self = next;
        Some(SessionSwitch { removed, added })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wallet() -> Address {
        Address::parse("0x1234567890abcdef1234567890abcdef12345678").unwrap()
    }

    #[test]
    fn test_public_defaults() {
        let session = WalletSession::default();
        assert!(session.feed_user().is_public());
        assert_eq!(
            session.default_channels(),
            vec![Channel::account(Address::public())]
        );
    }

    #[test]
    fn test_switch_public_to_wallet_and_back() {
        let mut session = WalletSession::default();

        let switch = session.switch(Some(wallet())).unwrap();
        assert_eq!(switch.removed, vec![Channel::account(Address::public())]);
        assert_eq!(switch.added.len(), 2);
        assert_eq!(session.address(), Some(&wallet()));

        assert!(session.switch(Some(wallet())).is_none());

        let back = session.switch(None).unwrap();
        assert_eq!(back.added, vec![Channel::account(Address::public())]);
        assert!(back.removed.contains(&Channel::historical_orders(wallet())));
    }

    #[test]
    fn test_successor_matches_channel_kind() {
        let mut session = WalletSession::default();
        let to_wallet = session.switch(Some(wallet())).unwrap();
        assert_eq!(
            to_wallet.successor(&Channel::account(Address::public())),
            Some(&Channel::account(wallet()))
        );

        let to_public = session.switch(None).unwrap();
        assert_eq!(
            to_public.successor(&Channel::account(wallet())),
            Some(&Channel::account(Address::public()))
        );
        assert_eq!(to_public.successor(&Channel::historical_orders(wallet())), None);
    }

    #[test]
    fn test_zero_address_is_public() {
        let mut session = WalletSession::default();
        assert!(session.switch(Some(Address::public())).is_none());
    }
}
