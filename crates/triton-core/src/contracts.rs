//! Known Gnosis contract addresses and staking programs.

use crate::domain::Address;

pub const OLAS_TOKEN_GNOSIS: &str = "0xcE11e14225575945b8E6Dc0D4F2dD4C570f79d9f";
pub const WRAPPED_NATIVE_GNOSIS: &str = "0xe91D153E0b41518A2Ce8Dd3D7944Fa863463a97d";

/// Default mech when neither activity-checker generation answers.
pub const FALLBACK_MECH: &str = "0x77af31De935740567Cf4fF1986D04B2c964A786a";

/// One staking program: the program id the operate daemon reports, a display
/// name, the staking contract, and its total slot count.
#[derive(Clone, Copy, Debug)]
pub struct StakingProgram {
    pub id: &'static str,
    pub name: &'static str,
    pub address: &'static str,
    pub slots: u32,
}

impl StakingProgram {
    pub fn contract_address(&self) -> Address {
        Address::new(self.address).expect("well-formed program address")
    }
}

pub const STAKING_PROGRAMS: &[StakingProgram] = &[
    StakingProgram {
        id: "hobbyist",
        name: "Hobbyist (100 OLAS)",
        address: "0x389b46c259631acd6a69bde8b6cee218230bae8c",
        slots: 100,
    },
    StakingProgram {
        id: "hobbyist_2",
        name: "Hobbyist 2 (500 OLAS)",
        address: "0x238eb6993b90a978ec6aad7530d6429c949c08da",
        slots: 50,
    },
    StakingProgram {
        id: "expert",
        name: "Expert (1k OLAS)",
        address: "0x5344b7dd311e5d3dddd46a4f71481bd7b05aaa3e",
        slots: 20,
    },
    StakingProgram {
        id: "expert_2",
        name: "Expert 2 (1k OLAS)",
        address: "0xb964e44c126410df341ae04b13ab10a985fe3513",
        slots: 40,
    },
    StakingProgram {
        id: "expert_3",
        name: "Expert 3 (2k OLAS)",
        address: "0x80fad33cadb5f53f9d29f02db97d682e8b101618",
        slots: 20,
    },
    StakingProgram {
        id: "expert_4",
        name: "Expert 4 (10k OLAS)",
        address: "0xad9d891134443b443d7f30013c7e14fe27f2e029",
        slots: 26,
    },
    StakingProgram {
        id: "expert_5",
        name: "Expert 5 (10k OLAS)",
        address: "0xe56df1e563de1b10715cb313d514af350d207212",
        slots: 26,
    },
    StakingProgram {
        id: "expert_6",
        name: "Expert 6 (1k OLAS)",
        address: "0x2546214aee7eea4bee7689c81231017ca231dc93",
        slots: 40,
    },
    StakingProgram {
        id: "expert_7",
        name: "Expert 7 (10k OLAS)",
        address: "0xd7a3c8b975f71030135f1a66e9e23164d54ff455",
        slots: 26,
    },
];

pub fn staking_program_by_id(id: &str) -> Option<&'static StakingProgram> {
    STAKING_PROGRAMS.iter().find(|p| p.id == id)
}

pub fn olas_token() -> Address {
    Address::new(OLAS_TOKEN_GNOSIS).expect("well-formed token address")
}

pub fn wrapped_native_token() -> Address {
    Address::new(WRAPPED_NATIVE_GNOSIS).expect("well-formed token address")
}

pub fn fallback_mech() -> Address {
    Address::new(FALLBACK_MECH).expect("well-formed mech address")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn program_lookup_by_id() {
        let program = staking_program_by_id("expert_3").unwrap();
        assert_eq!(program.name, "Expert 3 (2k OLAS)");
        assert_eq!(program.slots, 20);
        assert!(staking_program_by_id("unknown").is_none());
    }

    #[test]
    fn known_addresses_parse() {
        olas_token();
        wrapped_native_token();
        fallback_mech();
        for program in STAKING_PROGRAMS {
            program.contract_address();
        }
    }
}
