//! Solidity contract ABI bindings for USDC (ERC-20) and the CCTP
//! TokenMessenger / MessageTransmitter pair.
//!
//! Declared inline rather than from committed ABI JSON; these are exactly the
//! fragments the orchestrator calls (V2 `depositForBurn` shape with `maxFee`
//! and `minFinalityThreshold`).

use alloy::sol;

sol!(
    #[sol(rpc)]
    #[derive(Debug)]
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
        function decimals() external view returns (uint8);
    }
);

sol!(
    #[sol(rpc)]
    #[derive(Debug)]
    interface ITokenMessenger {
        function depositForBurn(
            uint256 amount,
            uint32 destinationDomain,
            bytes32 mintRecipient,
            address burnToken,
            bytes32 destinationCaller,
            uint256 maxFee,
            uint32 minFinalityThreshold
        ) external returns (uint64 nonce);
    }
);

sol!(
    #[sol(rpc)]
    #[derive(Debug)]
    interface IMessageTransmitter {
        event MessageSent(bytes message);

        function receiveMessage(
            bytes calldata message,
            bytes calldata attestation
        ) external returns (bool success);
    }
);
