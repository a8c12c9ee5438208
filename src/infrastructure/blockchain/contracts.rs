//! # Contract Bindings
//!
//! Typed bindings for the contracts the node talks to, generated from
//! human-readable ABI fragments. Only the functions the node calls are
//! declared.

#![allow(missing_docs)]
#![allow(clippy::all)]

use ethers::contract::abigen;

abigen!(
    ProofOfStake,
    r#"[
        function currentIndex() external view returns (uint256)
        function isActive(uint256 _index) external view returns (bool)
        function getStakingAddress(uint256 _index) external view returns (address)
        function getBlockSelectorAddress(uint256 _index) external view returns (address)
        function getBlockSelectorIndex(uint256 _index) external view returns (uint256)
        function getRewardManagerAddress(uint256 _index) external view returns (address)
        function produceBlock(uint256 _index) external returns (bool)
    ]"#
);

abigen!(
    Staking,
    r#"[
        function getStakedBalance(address _userAddress) external view returns (uint256)
        function getMaturingBalance(address _userAddress) external view returns (uint256)
        function getMaturingTimestamp(address _userAddress) external view returns (uint256)
    ]"#
);

abigen!(
    RewardManager,
    r#"[
        function getCurrentReward() external view returns (uint256)
    ]"#
);

abigen!(
    BlockSelector,
    r#"[
        function canProduceBlock(uint256 _index, address _user, uint256 _weight) external view returns (bool)
        function getState(uint256 _index, address _user) external view returns (uint256[5])
    ]"#
);

abigen!(
    WorkerAuthManager,
    r#"[
        function isAvailable(address workerAddress) external view returns (bool)
        function isPending(address workerAddress) external view returns (bool)
        function isOwned(address workerAddress) external view returns (bool)
        function isRetired(address workerAddress) external view returns (bool)
        function getOwner(address workerAddress) external view returns (address)
        function getUser(address workerAddress) external view returns (address)
        function acceptJob() external
        function isAuthorized(address _workerAddress, address _dappAddress) external view returns (bool)
    ]"#
);

abigen!(
    StakingPoolContract,
    r#"[
        function amounts() external view returns (uint256 stake, uint256 unstake, uint256 withdraw)
        function rebalance() external
        function produceBlock(uint256 _index) external returns (bool)
        function canCycleStakeMaturation() external view returns (bool)
        function cycleStakeMaturation() external
        function canCycleWithdrawRelease() external view returns (bool)
        function cycleWithdrawRelease() external
    ]"#
);

abigen!(
    Ownable,
    r#"[
        function owner() external view returns (address)
    ]"#
);
