//! Contract interfaces the bot reads.
//!
//! Probe-sized `sol!` bindings: only the functions actually called. The
//! staking token and activity checker declarations cover both contract
//! generations; which getters exist on a given deployment is discovered at
//! call time.

use alloy::sol;

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract IERC20 {
        function balanceOf(address account) external view returns (uint256);
        function decimals() external view returns (uint8);
    }

    #[allow(missing_docs)]
    #[sol(rpc)]
    contract IStakingToken {
        function mapServiceInfo(uint256 serviceId) external view returns (
            address multisig,
            address owner,
            uint256 tsStart,
            uint256 reward,
            uint256 inactivity
        );
        function getServiceInfo(uint256 serviceId) external view returns (
            address multisig,
            address owner,
            uint256[] memory nonces,
            uint256 tsStart,
            uint256 reward,
            uint256 inactivity
        );
        function livenessPeriod() external view returns (uint256);
        function tsCheckpoint() external view returns (uint256);
        function metadataHash() external view returns (bytes32);
        function getServiceIds() external view returns (uint256[] memory);
        function activityChecker() external view returns (address);
    }

    #[allow(missing_docs)]
    #[sol(rpc)]
    contract IActivityChecker {
        function livenessRatio() external view returns (uint256);
        function mechMarketplace() external view returns (address);
        function agentMech() external view returns (address);
    }

    #[allow(missing_docs)]
    #[sol(rpc)]
    contract IMech {
        function mapRequestsCounts(address requester) external view returns (uint256);
        function mapRequestCounts(address requester) external view returns (uint256);
    }
}
