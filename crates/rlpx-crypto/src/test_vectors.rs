//! Known-answer vectors for the handshake, secret derivation, and framing.
//!
//! Keys, nonces, handshake packets and expected secrets are the published
//! go-ethereum RLPx and EIP-8 test vectors. `SEALED_AUTH` is the one
//! exception: it was sealed with a fixed envelope key and IV so the envelope
//! cipher can be checked byte for byte.

/// Initiator static secret.
pub const KEY_A: &str = "49a7b37aa6f6645917e7b807e9d1c00d4fa71f18343b0d4122a4d2df64dd6fee";
/// Recipient static secret.
pub const KEY_B: &str = "b71c71a67e1177ad4e901695e1b4b9ee17ae16c6668d313eac2f96dbcda3f291";
pub const EPHEMERAL_A: &str = "869d6ecf5211f1cc60418a13b9d870b22959d0c16f02bec714c960dd2298a32d";
pub const EPHEMERAL_B: &str = "e238eb8e04fee6511ab04c6dd3c89ce097b11f25d584863ac2b6d5b35b1847e4";
pub const NONCE_A: &str = "7e968bba13b6c50e2c4cd7f241cc0d64d1ac25c7f5952df231ac6a2bda8ee5d6";
pub const NONCE_B: &str = "559aead08264d5795d3909718cdd05abd49572e84fe55590eef31a88a08fdffd";
/// Envelope ephemeral secret used to seal `SEALED_AUTH`.
pub const AUTH_ENVELOPE_KEY: &str = "0275b22fa69ccca9ce9d75918710bf73c86f4f47f17af843feadabb3b662b359";
pub const AUTH_ENVELOPE_IV: &str = "000102030405060708090a0b0c0d0e0f";
/// EIP-8 auth from A to B (version 56, trailing items `[1, 2, [4, 5]]`) sealed
/// with `AUTH_ENVELOPE_KEY` and `AUTH_ENVELOPE_IV`.
pub const SEALED_AUTH: &str = concat!(
    "018304214ba5ce8477fdd4d417dfe12c86db08e5f2de632facdd836452d23f2c",
    "972d389c18d2efe18fb30918609272fbe3d9555fe0a93fb9dcf953eea1e5e183",
    "12360a000102030405060708090a0b0c0d0e0f63997f4b295f962c845aac5735",
    "f637eeab6bc3bdb9da4ea7fff1b49ab5d30ccf2744bc4a83d50b4e07c2b66169",
    "35f0c9ee17d7bfd8e88d3267479f685828464070a6f937797a28b9a3f2b7a5f1",
    "3a3ab16377812eeafb99138ee53f2093b6ef1e98ffe9e5f5b710b8e9c7bac7a0",
    "49d48b5234f9646f0a61080e965da89a17f5837bb85e5f7c54d43b7614ef4365",
    "a703a7172fbfc9088baacc7aee8a8407e2c66c15ee2b5920a8484c3d4bec4c6e",
    "490f968448ca4931424fa3334fc9981f386811f03cc05327bcfa46d905140920",
    "15714b8bf55ae5bb4cadaea32eb8548047b8181bcde47442d4d16f1a58a9bc82",
    "5bf60f97485f526cc28e528bce26e09809c5944f05141a6bcb8ea2c73ee52557",
    "18eee23b9e0f11babe1f9ffbbaadceda5a20e6e3c738672f0ca76bf17f072023",
    "2cce74654e",
);
/// Published pre-EIP-8 auth from A to B.
pub const AUTH_1: &str = concat!(
    "048ca79ad18e4b0659fab4853fe5bc58eb83992980f4c9cc147d2aa31532efd2",
    "9a3d3dc6a3d89eaf913150cfc777ce0ce4af2758bf4810235f6e6ceccfee1acc",
    "6b22c005e9e3a49d6448610a58e98744ba3ac0399e82692d67c1f58849050b30",
    "24e21a52c9d3b01d871ff5f210817912773e610443a9ef142e91cdba0bd77b5f",
    "df0769b05671fc35f83d83e4d3b0b000c6b2a1b1bba89e0fc51bf4e460df3105",
    "c444f14be226458940d6061c296350937ffd5e3acaceeaaefd3c6f74be8e23e0",
    "f45163cc7ebd76220f0128410fd05250273156d548a414444ae2f7dea4dfca2d",
    "43c057adb701a715bf59f6fb66b2d1d20f2c703f851cbf5ac47396d9ca65b626",
    "0bd141ac4d53e2de585a73d1750780db4c9ee4cd4d225173a4592ee77e2bd94d",
    "0be3691f3b406f9bba9b591fc63facc016bfa8",
);
/// Published EIP-8 auth from A to B: version 4, no trailing items.
pub const AUTH_2: &str = concat!(
    "01b304ab7578555167be8154d5cc456f567d5ba302662433674222360f08d5f1",
    "534499d3678b513b0fca474f3a514b18e75683032eb63fccb16c156dc6eb2c0b",
    "1593f0d84ac74f6e475f1b8d56116b849634a8c458705bf83a626ea0384d4d73",
    "41aae591fae42ce6bd5c850bfe0b999a694a49bbbaf3ef6cda61110601d3b4c0",
    "2ab6c30437257a6e0117792631a4b47c1d52fc0f8f89caadeb7d02770bf999cc",
    "147d2df3b62e1ffb2c9d8c125a3984865356266bca11ce7d3a688663a51d82de",
    "faa8aad69da39ab6d5470e81ec5f2a7a47fb865ff7cca21516f9299a07b1bc63",
    "ba56c7a1a892112841ca44b6e0034dee70c9adabc15d76a54f443593fafdc3b2",
    "7af8059703f88928e199cb122362a4b35f62386da7caad09c001edaeb5f8a06d",
    "2b26fb6cb93c52a9fca51853b68193916982358fe1e5369e249875bb8d0d0ec3",
    "6f917bc5e1eafd5896d46bd61ff23f1a863a8a8dcd54c7b109b771c8e61ec9c8",
    "908c733c0263440e2aa067241aaa433f0bb053c7b31a838504b148f570c0ad62",
    "837129e547678c5190341e4f1693956c3bf7678318e2d5b5340c9e488eefea19",
    "8576344afbdf66db5f51204a6961a63ce072c8926c",
);
/// Published EIP-8 auth from A to B: version 56, trailing items `[1, 2, [4, 5]]`.
pub const AUTH_3: &str = concat!(
    "01b8044c6c312173685d1edd268aa95e1d495474c6959bcdd10067ba4c9013df",
    "9e40ff45f5bfd6f72471f93a91b493f8e00abc4b80f682973de715d77ba3a005",
    "a242eb859f9a211d93a347fa64b597bf280a6b88e26299cf263b01b8dfdb7122",
    "78464fd1c25840b995e84d367d743f66c0e54a586725b7bbf12acca27170ae32",
    "83c1073adda4b6d79f27656993aefccf16e0d0409fe07db2dc398a1b7e8ee93b",
    "cd181485fd332f381d6a050fba4c7641a5112ac1b0b61168d20f01b479e19adf",
    "7fdbfa0905f63352bfc7e23cf3357657455119d879c78d3cf8c8c06375f3f7d4",
    "861aa02a122467e069acaf513025ff196641f6d2810ce493f51bee9c966b15c5",
    "043505350392b57645385a18c78f14669cc4d960446c17571b7c5d725021babb",
    "cd786957f3d17089c084907bda22c2b2675b4378b114c601d858802a55345a15",
    "116bc61da4193996187ed70d16730e9ae6b3bb8787ebcaea1871d850997ddc08",
    "b4f4ea668fbf37407ac044b55be0908ecb94d4ed172ece66fd31bfdadf2b97a8",
    "bc690163ee11f5b575a4b44e36e2bfb2f0fce91676fd64c7773bac6a003f481f",
    "ddd0bae0a1f31aa27504e2a533af4cef3b623f4791b2cca6d490",
);
/// Published EIP-8 ack from B to A answering `AUTH_2`: version 4.
pub const ACK_2: &str = concat!(
    "01ea0451958701280a56482929d3b0757da8f7fbe5286784beead59d95089c21",
    "7c9b917788989470b0e330cc6e4fb383c0340ed85fab836ec9fb8a49672712ae",
    "abbdfd1e837c1ff4cace34311cd7f4de05d59279e3524ab26ef753a0095637ac",
    "88f2b499b9914b5f64e143eae548a1066e14cd2f4bd7f814c4652f11b254f8a2",
    "d0191e2f5546fae6055694aed14d906df79ad3b407d94692694e259191cde171",
    "ad542fc588fa2b7333313d82a9f887332f1dfc36cea03f831cb9a23fea05b33d",
    "eb999e85489e645f6aab1872475d488d7bd6c7c120caf28dbfc5d6833888155e",
    "d69d34dbdc39c1f299be1057810f34fbe754d021bfca14dc989753d61c413d26",
    "1934e1a9c67ee060a25eefb54e81a4d14baff922180c395d3f998d70f46f6b58",
    "306f969627ae364497e73fc27f6d17ae45a413d322cb8814276be6ddd13b885b",
    "201b943213656cde498fa0e9ddc8e0b8f8a53824fbd82254f3e2c17e8eaea009",
    "c38b4aa0a3f306e8797db43c25d68e86f262e564086f59a2fc60511c42abfb30",
    "57c247a8a8fe4fb3ccbadde17514b7ac8000cdb6a912778426260c47f38919a9",
    "1f25f4b5ffb455d6aaaf150f7e5529c100ce62d6d92826a71778d809bdf60232",
    "ae21ce8a437eca8223f45ac37f6487452ce626f549b3b5fdee26afd2072e4bc7",
    "5833c2464c805246155289f4",
);
pub const AES_SECRET: &str = "80e8632c05fed6fc2a13b0f8d31a3cf645366239170ea067065aba8e28bac487";
pub const MAC_SECRET: &str = "2ea74ec5dae199227dff1af715362700e989d889d7a493cb0639691efb8e5f98";
/// Published digest of B's ingress MAC after `AUTH_2`/`ACK_2` and absorbing `foo`.
pub const INGRESS_B_AFTER_FOO: &str =
    "0c7ec6340062cc46f5e9f1e3cf86f8c8c403c5a0964f5df0ebd34a75ddc86db5";
/// Frame with code 8 and payload `c401020304`, keyed with keccak256("") and fresh MAC states.
pub const FRAME_1: &str = concat!(
    "00828ddae471818bb0bfa6b551d1cb42e5e0de0c87a22a8994e1710717a2b98d",
    "ba628a4ba590cb43f7848f41c43828850df5eedb2f01442e3c4fef533ec0cf3b",
);
/// The next frame on the same stream: code 0x10 and an empty payload.
pub const FRAME_2: &str = concat!(
    "348ae409790d44bf3451aa1fa87ad6deccb0248b8d6eabb51ad9b7da8e1f861d",
    "d5a4550b5a09b5d42e97f9bcd2f3b15a7a46c4904a4b24edd10a44c129991ae6",
);

pub fn bytes(hex: &str) -> Vec<u8> {
    hex::decode(hex).unwrap()
}

pub fn array32(hex: &str) -> [u8; 32] {
    bytes(hex).try_into().unwrap()
}

pub fn secret(hex: &str) -> secp256k1::SecretKey {
    secp256k1::SecretKey::from_slice(&bytes(hex)).unwrap()
}
