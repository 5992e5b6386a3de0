//! ABI bindings for the contracts the flows talk to.

use alloy_sol_types::sol;

sol! {
    #[derive(Debug, PartialEq, Eq)]
    interface IERC20 {
        event Approval(address indexed owner, address indexed spender, uint256 value);

        function allowance(address owner, address spender) external view returns (uint256 remaining);
        function approve(address spender, uint256 amount) external returns (bool success);
        function balanceOf(address account) external view returns (uint256 balance);
        function decimals() external view returns (uint8 places);
        function totalSupply() external view returns (uint256 supply);
        function name() external view returns (string value);
        function nonces(address owner) external view returns (uint256 nonce);
    }
}

sol! {
    // reserves are uint112 on chain, widened here so they decode straight into U256
    #[derive(Debug, PartialEq, Eq)]
    interface IUniswapV2Pair {
        function token0() external view returns (address token);
        function getReserves() external view returns (uint256 reserve0, uint256 reserve1, uint32 blockTimestampLast);
    }
}

sol! {
    /// Event shared by the ether and LEVX airdrop contracts.
    #[derive(Debug, PartialEq, Eq)]
    interface IAirdropEvents {
        event Claim(bytes32 indexed merkleRoot, address indexed account, uint256 amount);
    }
}

sol! {
    #[derive(Debug, PartialEq, Eq)]
    interface IETHAirdrop {
        function claim(bytes32 merkleRoot, bytes32[] merkleProof, uint256 amount, address beneficiary) external;
        function claimAndSwapToLevx(
            bytes32 merkleRoot,
            bytes32[] merkleProof,
            uint256 amount,
            uint256 amountOutMin,
            address beneficiary,
            uint256 deadline
        ) external;
    }
}

sol! {
    #[derive(Debug, PartialEq, Eq)]
    interface ILevxAirdrop {
        function claim(bytes32 merkleRoot, bytes32[] merkleProof, uint256 amount) external;
    }
}

sol! {
    #[derive(Debug, PartialEq, Eq)]
    interface IZeroMoney {
        event Claim(uint256 indexed id, address indexed account, uint256 amount);

        function claim(uint256 id, uint8 v, bytes32 r, bytes32 s) external;
        function withdrawableDividendOf(address owner) external view returns (uint256 amount);
        function withdrawDividend() external;
    }
}

sol! {
    #[derive(Debug, PartialEq, Eq)]
    interface ILevxDistribution {
        event Claim(uint256 indexed id, address indexed account, uint256 amount);

        function claim(uint256 id, uint256 amount, uint8 v, bytes32 r, bytes32 s) external;
    }
}

sol! {
    #[derive(Debug, PartialEq, Eq)]
    interface ILevxPayout {
        event Start(uint256 indexed id, address indexed from, address indexed recipient, uint256 amount);
        event Claim(uint256 indexed id, uint256 amount, address to);

        function pendingAmount(uint256 id) external view returns (uint256 amount);
        function claim(uint256 id, address callee, bytes data) external;
    }
}

sol! {
    #[derive(Debug, PartialEq, Eq)]
    interface ISwapper {
        function swap(uint256 amount, address to) external;
    }
}

sol! {
    #[derive(Debug, PartialEq, Eq)]
    interface IMigratoooooor {
        function migrate(uint256 liquidity, uint256 amountWethAddedMin, uint256 deadline, address to) external;
        function migrateWithPermit(
            uint256 liquidity,
            uint256 amountWethAddedMin,
            uint256 deadline,
            address to,
            uint8 v,
            bytes32 r,
            bytes32 s
        ) external;
    }
}
