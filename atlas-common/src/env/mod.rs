pub mod commit;
pub mod endorsement;
pub mod envelope;
pub mod order;
pub mod policy;
pub mod proposal;

pub use commit::{CommitEvent, CommitOutcome, PeerCommit};
pub use endorsement::{
    ChaincodeResponse, EndorsedResponse, Endorsement, ErrorDetail, ProposalResponse, RawProposalResponse,
};
pub use envelope::{MessageDetail, ResponseEnvelope};
pub use order::{OrderRequest, OrderResult, OrderStatus};
pub use policy::EndorsementPolicy;
pub use proposal::Proposal;
