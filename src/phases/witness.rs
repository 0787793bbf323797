use {
    crate::{
        config::ProtocolConfig,
        error::{expect_len, ProtocolError, Result},
        gadgets::{
            bits::CircuitBits,
            curve::{BabyJubjub, Point, PointRepr},
            field::CurveScalar,
        },
        phases::{
            accumulator::{validate_captures, StepInput, Transition},
            blinding::{BlindedTag, HashedIdentifier},
            intersection::{IntersectionResult, PsiResponse},
        },
        utils::game::CaptureVector,
    },
    serde::{Deserialize, Serialize},
};

fn encode_points(points: &[Point]) -> Vec<PointRepr> {
    points.iter().map(PointRepr::from).collect()
}

fn decode_points(
    curve: &BabyJubjub,
    field: &'static str,
    expected: usize,
    points: &[PointRepr],
) -> Result<Vec<Point>> {
    expect_len(field, expected, points.len())?;
    points.iter().map(|repr| curve.decode(repr)).collect()
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| ProtocolError::MalformedPeerData(e.to_string()))
}

/// Inputs of the step circuit, in the encoding proving systems consume
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepWitness {
    pub version: u64,
    pub step: u64,
    pub commitment_before: [String; 4],
    pub commitment_after: [String; 4],
    /// committed next state, 4 fields per cell
    pub serialized_state: Vec<String>,
    pub serialized_misc: Vec<String>,
    pub action_batch: Vec<[i64; 8]>,
    pub damage: Vec<String>,
    pub captures: Vec<u8>,
    pub action_captures: Vec<u8>,
    pub blinding_exponents: Vec<CircuitBits>,
    pub step_exponent: CircuitBits,
    pub outgoing_tags: Vec<PointRepr>,
    pub received_peer_data: Option<PeerPayload>,
}

impl StepWitness {
    /**
     * Assemble the witness of an accepted fold
     *
     * @param config - protocol configuration
     * @param step - index of the step in the chain, starting at 1
     * @param input - step input that was folded
     * @param transition - accepted transition for `input`
     * @param step_exponent - exponent the player answers the peer with
     * @param received_peer_data - what the peer sent for this step, if anything
     * @return - witness record
     */
    pub fn new(
        config: &ProtocolConfig,
        step: u64,
        input: &StepInput,
        transition: &Transition,
        step_exponent: &CurveScalar,
        received_peer_data: Option<PeerPayload>,
    ) -> Result<Self> {
        let state = transition.next_state.serialize(&transition.next_misc);
        let (cells, misc) = state.split_at(config.state_size * 4);
        Ok(Self {
            version: config.version,
            step,
            commitment_before: transition.commitment_before.to_decimal(),
            commitment_after: transition.commitment_after.to_decimal(),
            serialized_state: cells.iter().map(ToString::to_string).collect(),
            serialized_misc: misc.iter().map(ToString::to_string).collect(),
            action_batch: input.actions.iter().map(|a| a.canonical()).collect(),
            damage: input.damage.iter().map(ToString::to_string).collect(),
            captures: transition.captures.as_slice().to_vec(),
            action_captures: transition.action_captures.as_slice().to_vec(),
            blinding_exponents: input
                .blinding_exponents
                .iter()
                .map(CurveScalar::to_bits)
                .collect::<Result<Vec<_>>>()?,
            step_exponent: step_exponent.to_bits()?,
            outgoing_tags: encode_points(&transition.tags),
            received_peer_data,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        to_json(self)
    }
}

/// Inputs of the reconciliation circuit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationWitness {
    pub version: u64,
    pub step: u64,
    pub hashed_identifiers: Vec<PointRepr>,
    pub inverse_exponents: Vec<CircuitBits>,
    pub dh_output: Vec<PointRepr>,
    pub hidden_tags: Vec<PointRepr>,
    pub confirmed: Vec<u8>,
}

impl ReconciliationWitness {
    /**
     * Assemble the witness of an intersection check
     *
     * @param config - protocol configuration
     * @param step - step the exchange belongs to
     * @param identifiers - the owner's hashed identifiers
     * @param exponents - the owner's per-cell exponents, inverted here
     * @param response - the peer's response
     * @param result - confirmed villages
     * @return - witness record
     */
    pub fn new(
        config: &ProtocolConfig,
        step: u64,
        identifiers: &[HashedIdentifier],
        exponents: &[CurveScalar],
        response: &PsiResponse,
        result: &IntersectionResult,
    ) -> Result<Self> {
        let inverse_exponents = exponents
            .iter()
            .map(|e| config.curve_order.modinv(e)?.to_bits())
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            version: config.version,
            step,
            hashed_identifiers: encode_points(identifiers),
            inverse_exponents,
            dh_output: encode_points(&response.dh_output),
            hidden_tags: encode_points(&response.hidden_tags),
            confirmed: result.to_capture_vector(config.nb_villages)?.as_slice().to_vec(),
        })
    }

    pub fn to_json(&self) -> Result<String> {
        to_json(self)
    }
}

/// Messages exchanged over the external peer channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum PeerPayload {
    /// Owner to claimer: blinded identifiers of every cell and the declared captures
    Commit {
        version: u64,
        step: u64,
        tags: Vec<PointRepr>,
        captures: Vec<u8>,
        action_captures: Vec<u8>,
    },
    /// Claimer to owner: double-blinded tags and hidden village identifiers
    Response {
        version: u64,
        step: u64,
        dh_output: Vec<PointRepr>,
        hidden_tags: Vec<PointRepr>,
    },
}

/// Validated content of a peer commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerCommit {
    pub step: u64,
    pub tags: Vec<BlindedTag>,
    pub captures: CaptureVector,
    pub action_captures: CaptureVector,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerMessage {
    Commit(PeerCommit),
    Response { step: u64, response: PsiResponse },
}

impl PeerPayload {
    pub fn commit(config: &ProtocolConfig, step: u64, transition: &Transition) -> Self {
        PeerPayload::Commit {
            version: config.version,
            step,
            tags: encode_points(&transition.tags),
            captures: transition.captures.as_slice().to_vec(),
            action_captures: transition.action_captures.as_slice().to_vec(),
        }
    }

    pub fn response(config: &ProtocolConfig, step: u64, response: &PsiResponse) -> Self {
        PeerPayload::Response {
            version: config.version,
            step,
            dh_output: encode_points(&response.dh_output),
            hidden_tags: encode_points(&response.hidden_tags),
        }
    }

    pub fn step(&self) -> u64 {
        match self {
            PeerPayload::Commit { step, .. } | PeerPayload::Response { step, .. } => *step,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        to_json(self)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ProtocolError::MalformedPeerData(e.to_string()))
    }

    /**
     * Validate everything the peer sent before any of it is used
     * @dev the peer's declared captures go through the same authorization rule as our own
     *
     * @param config - protocol configuration
     * @param curve - curve the points must lie on
     * @return - decoded message
     */
    pub fn validate(&self, config: &ProtocolConfig, curve: &BabyJubjub) -> Result<PeerMessage> {
        match self {
            PeerPayload::Commit {
                version,
                step,
                tags,
                captures,
                action_captures,
            } => {
                check_version(config, *version)?;
                let tags = decode_points(curve, "tags", config.state_size, tags)?;
                let captures = CaptureVector::from_bits("captures", captures)?;
                captures.expect_len("captures", config.nb_villages)?;
                let action_captures = CaptureVector::from_bits("action_captures", action_captures)?;
                action_captures.expect_len("action_captures", config.nb_villages)?;
                validate_captures(&captures, &action_captures)?;
                Ok(PeerMessage::Commit(PeerCommit {
                    step: *step,
                    tags,
                    captures,
                    action_captures,
                }))
            }
            PeerPayload::Response {
                version,
                step,
                dh_output,
                hidden_tags,
            } => {
                check_version(config, *version)?;
                Ok(PeerMessage::Response {
                    step: *step,
                    response: PsiResponse {
                        dh_output: decode_points(
                            curve,
                            "dh_output",
                            config.state_size,
                            dh_output,
                        )?,
                        hidden_tags: decode_points(
                            curve,
                            "hidden_tags",
                            config.nb_villages,
                            hidden_tags,
                        )?,
                    },
                })
            }
        }
    }

    /// Parse and validate a JSON payload received from the peer.
    pub fn decode(json: &str, config: &ProtocolConfig, curve: &BabyJubjub) -> Result<PeerMessage> {
        Self::from_json(json)?.validate(config, curve)
    }
}

fn check_version(config: &ProtocolConfig, version: u64) -> Result<()> {
    if version != config.version {
        return Err(ProtocolError::MalformedPeerData(format!(
            "protocol version {version}, expected {}",
            config.version
        )));
    }
    Ok(())
}
